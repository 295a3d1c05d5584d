use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for the time_engine module (`modules.time_engine` in the app config).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeEngineConfig {
    #[serde(default = "default_starting_balance_hours")]
    pub starting_balance_hours: i64,
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_reconcile_chunk_size")]
    pub reconcile_chunk_size: usize,
    #[serde(default = "default_streak_retry_attempts")]
    pub streak_retry_attempts: u32,
    /// Offset applied to the job clock when deciding whether local midnight was crossed.
    #[serde(default)]
    pub streak_utc_offset_minutes: i32,
    #[serde(default = "default_response_bonus_hours")]
    pub response_bonus_hours: i64,
    #[serde(default = "default_response_min_sentences")]
    pub response_min_sentences: usize,
    #[serde(default = "default_low_balance_threshold_hours")]
    pub low_balance_threshold_hours: f64,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_events_capacity")]
    pub events_capacity: usize,
    /// Shared secret for `/admin/*`. Admin routes reject every call when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub cors_enabled: bool,
}

impl Default for TimeEngineConfig {
    fn default() -> Self {
        Self {
            starting_balance_hours: default_starting_balance_hours(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_chunk_size: default_reconcile_chunk_size(),
            streak_retry_attempts: default_streak_retry_attempts(),
            streak_utc_offset_minutes: 0,
            response_bonus_hours: default_response_bonus_hours(),
            response_min_sentences: default_response_min_sentences(),
            low_balance_threshold_hours: default_low_balance_threshold_hours(),
            store_timeout_ms: default_store_timeout_ms(),
            events_capacity: default_events_capacity(),
            admin_token: None,
            resync_interval_secs: default_resync_interval_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            cors_enabled: false,
        }
    }
}

impl TimeEngineConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(10))
    }

    /// Falls back to UTC when the configured offset is out of range.
    pub fn streak_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.streak_utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

fn default_starting_balance_hours() -> i64 {
    336
}

fn default_reconcile_interval_secs() -> u64 {
    3600
}

fn default_reconcile_chunk_size() -> usize {
    50
}

fn default_streak_retry_attempts() -> u32 {
    3
}

fn default_response_bonus_hours() -> i64 {
    6
}

fn default_response_min_sentences() -> usize {
    3
}

fn default_low_balance_threshold_hours() -> f64 {
    24.0
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_events_capacity() -> usize {
    256
}

fn default_resync_interval_secs() -> u64 {
    15
}

fn default_tick_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_seed_values() {
        let cfg = TimeEngineConfig::default();
        assert_eq!(cfg.starting_balance_hours, 336);
        assert_eq!(cfg.reconcile_chunk_size, 50);
        assert_eq!(cfg.streak_retry_attempts, 3);
        assert_eq!(cfg.response_min_sentences, 3);
        assert_eq!(cfg.response_bonus_hours, 6);
        assert_eq!(cfg.store_timeout(), Duration::from_secs(5));
        assert!(cfg.admin_token.is_none());
    }

    #[test]
    fn partial_section_fills_defaults() {
        let cfg: TimeEngineConfig =
            serde_json::from_value(serde_json::json!({ "reconcile_chunk_size": 10 })).unwrap();
        assert_eq!(cfg.reconcile_chunk_size, 10);
        assert_eq!(cfg.starting_balance_hours, 336);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<TimeEngineConfig, _> =
            serde_json::from_value(serde_json::json!({ "chunk": 10 }));
        assert!(res.is_err());
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let cfg = TimeEngineConfig {
            streak_utc_offset_minutes: 100_000,
            ..Default::default()
        };
        assert_eq!(cfg.streak_offset().local_minus_utc(), 0);

        let cfg = TimeEngineConfig {
            streak_utc_offset_minutes: 120,
            ..Default::default()
        };
        assert_eq!(cfg.streak_offset().local_minus_utc(), 7200);
    }
}
