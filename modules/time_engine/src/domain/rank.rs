use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::contract::model::{LeaderboardQuery, Profile, RankedProfile, Timeframe};
use crate::domain::error::DomainError;
use crate::domain::EngineDeps;

/// Earliest `last_active` that still counts for the window.
pub fn window_start(timeframe: Timeframe, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match timeframe {
        Timeframe::Daily => Some(now - Duration::hours(24)),
        Timeframe::Weekly => Some(now - Duration::days(7)),
        Timeframe::AllTime => None,
    }
}

/// Rank by XP over the full set, then filter by name.
///
/// `sort_by` is stable, so equal XP keeps the input order.
pub fn rank_profiles(mut profiles: Vec<Profile>, search: Option<&str>) -> Vec<RankedProfile> {
    profiles.sort_by(|a, b| b.xp_points.cmp(&a.xp_points));
    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    profiles
        .into_iter()
        .enumerate()
        .map(|(index, p)| RankedProfile {
            rank: u32::try_from(index + 1).unwrap_or(u32::MAX),
            id: p.id,
            username: p.username,
            avatar_url: p.avatar_url,
            xp_points: p.xp_points,
            level: p.level,
            streak_days: p.streak_days,
        })
        .filter(|row| match &needle {
            Some(n) => row.username.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .collect()
}

#[derive(Clone)]
pub struct RankComputer {
    deps: EngineDeps,
}

impl RankComputer {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    /// Fetch failures degrade to an empty board.
    #[instrument(name = "time_engine.rank.leaderboard", skip(self), fields(timeframe = ?query.timeframe))]
    pub async fn leaderboard(&self, query: &LeaderboardQuery) -> Vec<RankedProfile> {
        let since = window_start(query.timeframe, self.deps.clock.now());
        match self
            .deps
            .store("profiles.list", self.deps.profiles.list_profiles(since))
            .await
        {
            Ok(profiles) => {
                let rows = rank_profiles(profiles, query.search.as_deref());
                debug!(rows = rows.len(), "leaderboard computed");
                rows
            }
            Err(e) => {
                error!(error = %e, "leaderboard fetch failed; returning empty board");
                Vec::new()
            }
        }
    }

    /// One plus the number of profiles with strictly more XP.
    #[instrument(name = "time_engine.rank.current", skip(self), fields(user_id = %user_id))]
    pub async fn current_rank(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let profile = self
            .deps
            .store("profiles.find", self.deps.profiles.find_profile(user_id))
            .await?
            .ok_or_else(|| DomainError::profile_not_found(user_id))?;
        let ahead = self
            .deps
            .store(
                "profiles.count_with_more_xp",
                self.deps.profiles.count_with_more_xp(profile.xp_points),
            )
            .await?;
        Ok(ahead + 1)
    }
}
