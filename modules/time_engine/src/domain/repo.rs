use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::contract::model::{
    CompletedMission, Mission, MissionCompletion, Profile, QuestionOfTheDay, QuestionResponse,
};

/// Minimal projection the reconciler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayCandidate {
    pub id: Uuid,
    pub time_balance: i64,
    pub last_active: Option<DateTime<Utc>>,
}

/// Conditional decay write.
///
/// Applied as `time_balance = max(0, time_balance - hours)` and only when the
/// stored `last_active` still equals `observed_last_active`; a mismatch means
/// another writer got there first and the row is left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayUpdate {
    pub id: Uuid,
    pub hours: i64,
    pub observed_last_active: Option<DateTime<Utc>>,
    pub new_last_active: DateTime<Utc>,
}

/// Relative change applied atomically by the store.
///
/// Both counters clamp at zero, `level` is recomputed from the new XP and
/// `last_active` is set to the write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileDelta {
    pub xp: i64,
    pub hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed(Profile),
    AlreadyCompleted,
    ProfileMissing,
}

/// Port for the domain layer: profile persistence.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>>;
    /// Returns false when a profile with the same id already exists.
    async fn insert_profile(&self, profile: Profile) -> anyhow::Result<bool>;
    /// Profiles active at or after `active_since` (all when `None`), in a
    /// stable order: `created_at`, then `id`.
    async fn list_profiles(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Profile>>;
    /// Profiles that have a `last_active` timestamp.
    async fn list_decay_candidates(&self) -> anyhow::Result<Vec<DecayCandidate>>;
    /// Apply one chunk atomically; returns rows actually changed.
    async fn apply_decay_batch(&self, batch: &[DecayUpdate]) -> anyhow::Result<usize>;
    /// `None` when the row is gone or the `last_active` guard did not match.
    async fn apply_decay(&self, update: &DecayUpdate) -> anyhow::Result<Option<Profile>>;
    /// `None` when the profile does not exist.
    async fn apply_delta(
        &self,
        id: Uuid,
        delta: ProfileDelta,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Profile>>;
    async fn count_with_more_xp(&self, xp: i64) -> anyhow::Result<u64>;
}

/// Port for the mission catalog and completions.
#[async_trait]
pub trait MissionRepository: Send + Sync {
    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>>;
    /// Active missions, newest first.
    async fn list_active_missions(&self) -> anyhow::Result<Vec<Mission>>;
    async fn insert_mission(&self, mission: Mission) -> anyhow::Result<()>;
    async fn has_completed(&self, user_id: Uuid, mission_id: Uuid) -> anyhow::Result<bool>;
    /// Record the completion and credit `delta` in one transaction.
    async fn complete_mission(
        &self,
        completion: MissionCompletion,
        delta: ProfileDelta,
    ) -> anyhow::Result<CompletionOutcome>;
    /// Most recent first.
    async fn list_completions(&self, user_id: Uuid) -> anyhow::Result<Vec<CompletedMission>>;
}

/// Port for questions of the day and their responses.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    async fn find_question(&self, id: Uuid) -> anyhow::Result<Option<QuestionOfTheDay>>;
    async fn find_question_for_date(
        &self,
        date: NaiveDate,
    ) -> anyhow::Result<Option<QuestionOfTheDay>>;
    async fn insert_question(&self, question: QuestionOfTheDay) -> anyhow::Result<()>;
    async fn insert_response(&self, response: QuestionResponse) -> anyhow::Result<()>;
    async fn has_responded(&self, user_id: Uuid, question_id: Uuid) -> anyhow::Result<bool>;
}
