//! Pure decay arithmetic. Time balances drain one hour per elapsed hour.
//!
//! Two flavours exist: whole-hour decay, which is what gets persisted, and
//! fractional decay, which is only ever displayed. Both clamp at zero and
//! treat a `last_active` in the future as zero elapsed time.

use chrono::{DateTime, Duration, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Hours between `last_active` and `now`, never negative.
pub fn elapsed_hours(last_active: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - last_active).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / MILLIS_PER_HOUR
    }
}

/// Result of a whole-hour decay step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayStep {
    /// Whole hours drained (before clamping).
    pub hours: i64,
    pub new_balance: i64,
    pub new_last_active: DateTime<Utc>,
}

/// Whole-hour decay; `None` when less than one full hour has elapsed.
///
/// `new_last_active` advances by the drained hours only, so the sub-hour
/// remainder keeps counting toward the next step and the fractional display
/// stays continuous across a persisted write.
pub fn whole_hour_decay(
    balance: i64,
    last_active: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DecayStep> {
    let hours = elapsed_hours(last_active, now).floor() as i64;
    if hours < 1 {
        return None;
    }
    Some(DecayStep {
        hours,
        new_balance: (balance - hours).max(0),
        new_last_active: last_active + Duration::hours(hours),
    })
}

/// Display-only balance with the partial hour applied.
pub fn fractional_balance(balance: i64, last_active: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (balance as f64 - elapsed_hours(last_active, now)).max(0.0)
}

/// Two decimals, as carried on the wire.
pub fn round_for_transport(hours: f64) -> f64 {
    if !hours.is_finite() {
        return 0.0;
    }
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn under_one_hour_is_a_no_op() {
        let now = t0() + Duration::minutes(59) + Duration::seconds(59);
        assert_eq!(whole_hour_decay(100, t0(), now), None);
    }

    #[test]
    fn floors_partial_hours() {
        let now = t0() + Duration::minutes(150);
        let step = whole_hour_decay(100, t0(), now).unwrap();
        assert_eq!(step.hours, 2);
        assert_eq!(step.new_balance, 98);
        assert_eq!(step.new_last_active, t0() + Duration::hours(2));
    }

    #[test]
    fn clamps_at_zero() {
        let now = t0() + Duration::hours(500);
        let step = whole_hour_decay(336, t0(), now).unwrap();
        assert_eq!(step.new_balance, 0);
        assert_eq!(whole_hour_decay(0, t0(), now).unwrap().new_balance, 0);
    }

    #[test]
    fn resync_at_same_instant_is_idempotent() {
        let now = t0() + Duration::hours(5);
        let first = whole_hour_decay(100, t0(), now).unwrap();
        assert_eq!(
            whole_hour_decay(first.new_balance, first.new_last_active, now),
            None
        );
    }

    #[test]
    fn display_is_continuous_across_a_persisted_step() {
        let now = t0() + Duration::minutes(210);
        let before = fractional_balance(10, t0(), now);
        let step = whole_hour_decay(10, t0(), now).unwrap();
        assert_eq!(step.new_balance, 7);
        assert_eq!(fractional_balance(step.new_balance, step.new_last_active, now), before);

        let later = now + Duration::minutes(30);
        let next = whole_hour_decay(step.new_balance, step.new_last_active, later).unwrap();
        assert_eq!(next.hours, 1);
        assert_eq!(next.new_last_active, t0() + Duration::hours(4));
    }

    #[test]
    fn future_last_active_counts_as_zero_elapsed() {
        let now = t0();
        let later = t0() + Duration::hours(3);
        assert_eq!(elapsed_hours(later, now), 0.0);
        assert_eq!(whole_hour_decay(10, later, now), None);
        assert_eq!(fractional_balance(10, later, now), 10.0);
    }

    #[test]
    fn fractional_balance_tracks_partial_hours() {
        let now = t0() + Duration::minutes(90);
        assert_eq!(fractional_balance(10, t0(), now), 8.5);
        assert_eq!(fractional_balance(1, t0(), now), 0.0);
    }

    #[test]
    fn transport_rounding_keeps_two_decimals() {
        assert_eq!(round_for_transport(8.456), 8.46);
        assert_eq!(round_for_transport(8.454), 8.45);
        assert_eq!(round_for_transport(f64::NAN), 0.0);
    }
}
