use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    client::TimeEngineApi,
    error::TimeEngineError,
    model::{
        BalanceSnapshot, LeaderboardQuery, MissionReward, RankedProfile, ReconcileSummary,
        ResponseOutcome,
    },
};
use crate::domain::service::Service;

/// In-process `TimeEngineApi` that delegates to the domain service.
pub struct TimeEngineLocalClient {
    service: Arc<Service>,
}

impl TimeEngineLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TimeEngineApi for TimeEngineLocalClient {
    async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, TimeEngineError> {
        Ok(self.service.get_balance(user_id).await?)
    }

    async fn complete_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<MissionReward, TimeEngineError> {
        Ok(self.service.complete_mission(user_id, mission_id).await?)
    }

    async fn submit_response(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        response: String,
    ) -> Result<ResponseOutcome, TimeEngineError> {
        Ok(self
            .service
            .submit_response(user_id, question_id, response)
            .await?)
    }

    async fn leaderboard(&self, query: LeaderboardQuery) -> Vec<RankedProfile> {
        self.service.leaderboard(&query).await
    }

    async fn reconcile(&self) -> Result<ReconcileSummary, TimeEngineError> {
        Ok(self.service.reconcile().await?)
    }
}
