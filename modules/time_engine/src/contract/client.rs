use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::error::TimeEngineError;
use crate::contract::model::{
    BalanceSnapshot, LeaderboardQuery, MissionReward, RankedProfile, ReconcileSummary,
    ResponseOutcome,
};

/// Public API trait for the time_engine module that other modules can use
#[async_trait]
pub trait TimeEngineApi: Send + Sync {
    /// Decayed balance; a missing profile yields the seeded default view.
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, TimeEngineError>;

    /// Credit a mission's rewards exactly once.
    async fn complete_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<MissionReward, TimeEngineError>;

    /// Store a question response and credit the bonus when it qualifies.
    async fn submit_response(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        response: String,
    ) -> Result<ResponseOutcome, TimeEngineError>;

    /// Ranked leaderboard; never fails, degrades to an empty list.
    async fn leaderboard(&self, query: LeaderboardQuery) -> Vec<RankedProfile>;

    /// Run one reconciliation pass now.
    async fn reconcile(&self) -> Result<ReconcileSummary, TimeEngineError>;
}
