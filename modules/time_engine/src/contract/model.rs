use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Stored player profile. `time_balance` is whole hours and never negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub time_balance: i64,
    pub xp_points: i64,
    pub level: i32,
    pub streak_days: i32,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a profile; balances are seeded by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Decayed view of a profile as of `as_of`.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSnapshot {
    pub profile: Profile,
    /// Fractional display balance, rounded to two decimals.
    pub balance: f64,
    pub low_balance: bool,
    /// Seeded fallback for a profile that does not exist yet; never persisted.
    pub is_default: bool,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub mission_type: String,
    pub time_reward: i64,
    pub xp_reward: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMission {
    pub title: String,
    pub description: Option<String>,
    pub mission_type: String,
    pub time_reward: i64,
    pub xp_reward: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionCompletion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mission_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// Completion row joined with its mission, for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedMission {
    pub completion: MissionCompletion,
    pub mission: Option<Mission>,
}

/// Result of a successful mission completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionReward {
    pub profile: Profile,
    pub mission_id: Uuid,
    pub xp_awarded: i64,
    pub time_awarded: i64,
    pub leveled_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOfTheDay {
    pub id: Uuid,
    pub question: String,
    pub active_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub question: String,
    pub active_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub response: String,
    pub sentences_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a response submission. The response is stored even when the
/// bonus could not be credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub response: QuestionResponse,
    pub bonus_hours: i64,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    Daily,
    Weekly,
    #[default]
    AllTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaderboardQuery {
    pub timeframe: Timeframe,
    pub search: Option<String>,
}

/// Leaderboard row. `rank` is the position before any search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedProfile {
    pub rank: u32,
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub xp_points: i64,
    pub level: i32,
    pub streak_days: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub profiles_updated: usize,
    pub profiles_failed: usize,
    pub streaks_updated: Option<u64>,
    pub timestamp: DateTime<Utc>,
}
