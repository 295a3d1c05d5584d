//! Scheduled batch decay.
//!
//! One pass reads every profile with a `last_active`, drains whole elapsed
//! hours and writes the changed rows back in fixed-size chunks. A chunk that
//! fails is logged and skipped; chunks already committed stay committed.
//! When the pass runs during local hour 0 it also triggers the daily streak
//! routine, which is the only failure that fails the pass.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::contract::model::ReconcileSummary;
use crate::domain::decay::whole_hour_decay;
use crate::domain::error::DomainError;
use crate::domain::events::TimeDomainEvent;
use crate::domain::repo::{DecayCandidate, DecayUpdate};
use crate::domain::EngineDeps;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub chunk_size: usize,
    pub streak_attempts: u32,
    pub streak_offset: FixedOffset,
}

pub struct Reconciler {
    deps: EngineDeps,
    config: ReconcilerConfig,
    /// Local date of the last successful streak run.
    streak_ran_on: Mutex<Option<NaiveDate>>,
}

impl Reconciler {
    pub fn new(deps: EngineDeps, config: ReconcilerConfig) -> Self {
        Self {
            deps,
            config,
            streak_ran_on: Mutex::new(None),
        }
    }

    #[instrument(name = "time_engine.reconciler.run", skip(self))]
    pub async fn run_once(&self) -> Result<ReconcileSummary, DomainError> {
        let now = self.deps.clock.now();
        let candidates = self
            .deps
            .store(
                "profiles.list_decay_candidates",
                self.deps.profiles.list_decay_candidates(),
            )
            .await?;

        let updates: Vec<DecayUpdate> = candidates
            .iter()
            .filter_map(|c| match plan_decay(c, now) {
                Ok(update) => update,
                Err(reason) => {
                    warn!(user_id = %c.id, %reason, "skipping profile");
                    None
                }
            })
            .collect();
        info!(
            candidates = candidates.len(),
            changed = updates.len(),
            "decay planned"
        );

        let chunk_size = self.config.chunk_size.max(1);
        let mut updated = 0usize;
        let mut failed = 0usize;
        for (index, chunk) in updates.chunks(chunk_size).enumerate() {
            match self
                .deps
                .store(
                    "profiles.apply_decay_batch",
                    self.deps.profiles.apply_decay_batch(chunk),
                )
                .await
            {
                Ok(applied) => {
                    debug!(chunk = index, size = chunk.len(), applied, "chunk committed");
                    updated += applied;
                }
                Err(e) => {
                    error!(chunk = index, size = chunk.len(), error = %e, "chunk failed; continuing");
                    failed += chunk.len();
                }
            }
        }

        let streaks_updated = if self.streak_due(now) {
            Some(self.run_streaks(now).await?)
        } else {
            None
        };

        self.deps.events.publish(&TimeDomainEvent::ReconcileFinished {
            profiles_updated: updated,
            at: now,
        });
        info!(updated, failed, ?streaks_updated, "reconcile finished");
        Ok(ReconcileSummary {
            profiles_updated: updated,
            profiles_failed: failed,
            streaks_updated,
            timestamp: now,
        })
    }

    /// Due at local hour 0, once per local date.
    fn streak_due(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.config.streak_offset);
        local.hour() == 0 && *self.streak_ran_on.lock() != Some(local.date_naive())
    }

    async fn run_streaks(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let attempts = self.config.streak_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self
                .deps
                .store("streaks.update", self.deps.streaks.update_streaks(now))
                .await
            {
                Ok(touched) => {
                    let local = now.with_timezone(&self.config.streak_offset);
                    *self.streak_ran_on.lock() = Some(local.date_naive());
                    info!(attempt, touched, "streaks updated");
                    return Ok(touched);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "streak update failed");
                    last_error = e.to_string();
                }
            }
        }
        error!(attempts, "streak update exhausted retries");
        Err(DomainError::StreakUpdateFailed {
            attempts,
            message: last_error,
        })
    }
}

/// `Ok(None)` when under one hour has elapsed; `Err` for a row that cannot be
/// decayed.
fn plan_decay(
    candidate: &DecayCandidate,
    now: DateTime<Utc>,
) -> Result<Option<DecayUpdate>, &'static str> {
    if candidate.time_balance < 0 {
        return Err("negative stored balance");
    }
    let Some(last_active) = candidate.last_active else {
        return Ok(None);
    };
    Ok(
        whole_hour_decay(candidate.time_balance, last_active, now).map(|step| DecayUpdate {
            id: candidate.id,
            hours: step.hours,
            observed_last_active: Some(last_active),
            new_last_active: step.new_last_active,
        }),
    )
}
