use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Server-confirmed balance. Replaced wholesale on every sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerSnapshot {
    pub balance_hours: f64,
    pub synced_at: DateTime<Utc>,
}

/// `max(0, balance - elapsed)`, in hours.
pub fn predict(snapshot: &ServerSnapshot, elapsed: Duration) -> f64 {
    (snapshot.balance_hours - elapsed.as_secs_f64() / 3600.0).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockState {
    Uninitialized,
    Synced {
        snapshot: ServerSnapshot,
        received_at: Instant,
    },
    Predicting {
        snapshot: ServerSnapshot,
        received_at: Instant,
        predicted: f64,
    },
    /// Stays put until the next sync.
    Depleted { snapshot: ServerSnapshot },
}

#[derive(Debug, Clone)]
pub struct OptimisticClock {
    state: ClockState,
}

impl Default for OptimisticClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimisticClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Uninitialized,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Accept a server value; any prediction drift is discarded.
    pub fn sync(&mut self, snapshot: ServerSnapshot, received_at: Instant) {
        self.state = ClockState::Synced {
            snapshot,
            received_at,
        };
    }

    /// Advance the prediction. `None` when there is nothing new to show.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let (snapshot, received_at) = match self.state {
            ClockState::Uninitialized | ClockState::Depleted { .. } => return None,
            ClockState::Synced {
                snapshot,
                received_at,
            }
            | ClockState::Predicting {
                snapshot,
                received_at,
                ..
            } => (snapshot, received_at),
        };

        let predicted = predict(&snapshot, now.saturating_duration_since(received_at));
        if predicted <= 0.0 {
            self.state = ClockState::Depleted { snapshot };
            return Some(0.0);
        }
        self.state = ClockState::Predicting {
            snapshot,
            received_at,
            predicted,
        };
        Some(predicted)
    }

    pub fn displayed(&self) -> Option<f64> {
        match self.state {
            ClockState::Uninitialized => None,
            ClockState::Synced { snapshot, .. } => Some(snapshot.balance_hours.max(0.0)),
            ClockState::Predicting { predicted, .. } => Some(predicted),
            ClockState::Depleted { .. } => Some(0.0),
        }
    }

    pub fn is_ticking(&self) -> bool {
        matches!(
            self.state,
            ClockState::Synced { .. } | ClockState::Predicting { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(hours: f64) -> ServerSnapshot {
        ServerSnapshot {
            balance_hours: hours,
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn uninitialized_clock_shows_nothing() {
        let mut clock = OptimisticClock::new();
        assert_eq!(clock.tick(Instant::now()), None);
        assert_eq!(clock.displayed(), None);
        assert!(!clock.is_ticking());
    }

    #[test]
    fn predicts_from_receive_time() {
        let t0 = Instant::now();
        let mut clock = OptimisticClock::new();
        clock.sync(snapshot(10.0), t0);
        assert_eq!(clock.displayed(), Some(10.0));

        let shown = clock.tick(t0 + Duration::from_secs(1800)).unwrap();
        assert!((shown - 9.5).abs() < 1e-9);
        assert!(matches!(clock.state(), ClockState::Predicting { .. }));
    }

    #[test]
    fn depletes_and_stops_until_resync() {
        let t0 = Instant::now();
        let mut clock = OptimisticClock::new();
        clock.sync(snapshot(1.0), t0);

        assert_eq!(clock.tick(t0 + Duration::from_secs(3600)), Some(0.0));
        assert!(matches!(clock.state(), ClockState::Depleted { .. }));
        assert!(!clock.is_ticking());
        assert_eq!(clock.tick(t0 + Duration::from_secs(7200)), None);

        clock.sync(snapshot(2.0), t0 + Duration::from_secs(7200));
        assert!(clock.is_ticking());
        assert_eq!(clock.displayed(), Some(2.0));
    }

    #[test]
    fn resync_overrides_drift() {
        let t0 = Instant::now();
        let mut clock = OptimisticClock::new();
        clock.sync(snapshot(5.0), t0);
        clock.tick(t0 + Duration::from_secs(3600));

        let t1 = t0 + Duration::from_secs(3600);
        clock.sync(snapshot(7.0), t1);
        let shown = clock.tick(t1 + Duration::from_secs(360)).unwrap();
        assert!((shown - 6.9).abs() < 1e-9);
    }
}
