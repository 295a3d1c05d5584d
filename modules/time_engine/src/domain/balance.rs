use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::contract::model::{BalanceSnapshot, Profile};
use crate::domain::decay::{fractional_balance, round_for_transport, whole_hour_decay};
use crate::domain::error::DomainError;
use crate::domain::events::TimeDomainEvent;
use crate::domain::repo::DecayUpdate;
use crate::domain::EngineDeps;

#[derive(Debug, Clone)]
pub struct BalanceConfig {
    pub starting_balance_hours: i64,
    pub low_balance_threshold_hours: f64,
}

/// On-demand single-profile decay: persists whole hours, reports the
/// fractional value.
#[derive(Clone)]
pub struct BalanceReader {
    deps: EngineDeps,
    config: BalanceConfig,
}

impl BalanceReader {
    pub fn new(deps: EngineDeps, config: BalanceConfig) -> Self {
        Self { deps, config }
    }

    #[instrument(name = "time_engine.balance.read", skip(self), fields(user_id = %id))]
    pub async fn read(&self, id: Uuid) -> Result<BalanceSnapshot, DomainError> {
        let now = self.deps.clock.now();
        let profile = self
            .deps
            .store("profiles.find", self.deps.profiles.find_profile(id))
            .await?
            .ok_or_else(|| DomainError::profile_not_found(id))?;

        let Some(last_active) = profile.last_active else {
            // No anchor yet: nothing has elapsed, start the clock now.
            let update = DecayUpdate {
                id,
                hours: 0,
                observed_last_active: None,
                new_last_active: now,
            };
            let display = profile.time_balance as f64;
            let stored = self.persist(&update, profile).await?;
            return Ok(self.snapshot(stored, display, false, now));
        };

        let display = fractional_balance(profile.time_balance, last_active, now);
        let Some(step) = whole_hour_decay(profile.time_balance, last_active, now) else {
            debug!("under one hour since last activity; nothing to persist");
            return Ok(self.snapshot(profile, display, false, now));
        };

        let update = DecayUpdate {
            id,
            hours: step.hours,
            observed_last_active: Some(last_active),
            new_last_active: step.new_last_active,
        };
        let stored = self.persist(&update, profile).await?;
        self.deps.events.publish(&TimeDomainEvent::BalanceDecayed {
            user_id: id,
            hours: step.hours,
            balance: stored.time_balance,
            at: now,
        });
        debug!(hours = step.hours, balance = stored.time_balance, "decay persisted");
        Ok(self.snapshot(stored, display, false, now))
    }

    /// Like [`read`](Self::read), but a missing profile yields the seeded
    /// default view instead of an error.
    pub async fn read_or_default(&self, id: Uuid) -> Result<BalanceSnapshot, DomainError> {
        match self.read(id).await {
            Err(DomainError::ProfileNotFound { .. }) => {
                debug!(user_id = %id, "profile missing; serving seeded default view");
                Ok(self.default_view(id))
            }
            other => other,
        }
    }

    /// Seed profile as it would look if created now. Never persisted.
    pub fn default_view(&self, id: Uuid) -> BalanceSnapshot {
        let now = self.deps.clock.now();
        let profile = seed_profile(id, String::new(), None, self.config.starting_balance_hours, now);
        let display = profile.time_balance as f64;
        self.snapshot(profile, display, true, now)
    }

    async fn persist(&self, update: &DecayUpdate, read: Profile) -> Result<Profile, DomainError> {
        let written = self
            .deps
            .store("profiles.apply_decay", self.deps.profiles.apply_decay(update))
            .await?;
        Ok(written.unwrap_or_else(|| {
            debug!("profile changed since read; keeping the concurrent write");
            read
        }))
    }

    fn snapshot(
        &self,
        profile: Profile,
        display: f64,
        is_default: bool,
        as_of: DateTime<Utc>,
    ) -> BalanceSnapshot {
        let balance = round_for_transport(display);
        BalanceSnapshot {
            low_balance: balance <= self.config.low_balance_threshold_hours,
            profile,
            balance,
            is_default,
            as_of,
        }
    }
}

/// Fresh profile with the starting allotment.
pub fn seed_profile(
    id: Uuid,
    username: String,
    avatar_url: Option<String>,
    starting_balance_hours: i64,
    now: DateTime<Utc>,
) -> Profile {
    Profile {
        id,
        username,
        avatar_url,
        time_balance: starting_balance_hours.max(0),
        xp_points: 0,
        level: 1,
        streak_days: 0,
        last_active: Some(now),
        created_at: now,
        updated_at: now,
    }
}
