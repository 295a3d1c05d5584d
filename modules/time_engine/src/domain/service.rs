use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::TimeEngineConfig;
use crate::contract::model::{
    BalanceSnapshot, CompletedMission, LeaderboardQuery, Mission, MissionReward, NewMission,
    NewProfile, NewQuestion, Profile, QuestionOfTheDay, RankedProfile, ReconcileSummary,
    ResponseOutcome,
};
use crate::domain::balance::{seed_profile, BalanceConfig, BalanceReader};
use crate::domain::error::DomainError;
use crate::domain::rank::RankComputer;
use crate::domain::reconciler::{Reconciler, ReconcilerConfig};
use crate::domain::repo::ProfileDelta;
use crate::domain::reward::{RewardConfig, RewardEngine};
use crate::domain::EngineDeps;

const MAX_USERNAME_LEN: usize = 64;
const MAX_TITLE_LEN: usize = 200;

/// Domain service facade. Depends only on ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    deps: EngineDeps,
    balances: BalanceReader,
    rewards: RewardEngine,
    ranks: RankComputer,
    reconciler: Arc<Reconciler>,
    starting_balance_hours: i64,
}

impl Service {
    pub fn new(deps: EngineDeps, config: &TimeEngineConfig) -> Self {
        let balances = BalanceReader::new(
            deps.clone(),
            BalanceConfig {
                starting_balance_hours: config.starting_balance_hours,
                low_balance_threshold_hours: config.low_balance_threshold_hours,
            },
        );
        let rewards = RewardEngine::new(
            deps.clone(),
            RewardConfig {
                response_bonus_hours: config.response_bonus_hours,
                response_min_sentences: config.response_min_sentences,
            },
        );
        let reconciler = Arc::new(Reconciler::new(
            deps.clone(),
            ReconcilerConfig {
                chunk_size: config.reconcile_chunk_size,
                streak_attempts: config.streak_retry_attempts,
                streak_offset: config.streak_offset(),
            },
        ));
        Self {
            ranks: RankComputer::new(deps.clone()),
            deps,
            balances,
            rewards,
            reconciler,
            starting_balance_hours: config.starting_balance_hours,
        }
    }

    pub fn reconciler(&self) -> Arc<Reconciler> {
        self.reconciler.clone()
    }

    /// Decayed balance, or the seeded default view for an unknown profile.
    pub async fn get_balance(&self, user_id: Uuid) -> Result<BalanceSnapshot, DomainError> {
        self.balances.read_or_default(user_id).await
    }

    /// Create the profile with seed values; returns the existing one when present.
    #[instrument(name = "time_engine.service.create_profile", skip(self), fields(user_id = %new.id))]
    pub async fn create_profile(&self, new: NewProfile) -> Result<Profile, DomainError> {
        let username = new.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username", "must not be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::validation(
                "username",
                format!("longer than {MAX_USERNAME_LEN} characters"),
            ));
        }

        let profile = seed_profile(
            new.id,
            username,
            new.avatar_url,
            self.starting_balance_hours,
            self.deps.clock.now(),
        );
        let inserted = self
            .deps
            .store(
                "profiles.insert",
                self.deps.profiles.insert_profile(profile.clone()),
            )
            .await?;
        if inserted {
            info!("profile created");
            return Ok(profile);
        }
        debug!("profile already exists");
        self.deps
            .store("profiles.find", self.deps.profiles.find_profile(new.id))
            .await?
            .ok_or_else(|| DomainError::profile_not_found(new.id))
    }

    pub async fn complete_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<MissionReward, DomainError> {
        self.rewards.complete_mission(user_id, mission_id).await
    }

    pub async fn submit_response(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        text: String,
    ) -> Result<ResponseOutcome, DomainError> {
        self.rewards.submit_response(user_id, question_id, text).await
    }

    pub async fn leaderboard(&self, query: &LeaderboardQuery) -> Vec<RankedProfile> {
        self.ranks.leaderboard(query).await
    }

    pub async fn current_rank(&self, user_id: Uuid) -> Result<u64, DomainError> {
        self.ranks.current_rank(user_id).await
    }

    pub async fn reconcile(&self) -> Result<ReconcileSummary, DomainError> {
        self.reconciler.run_once().await
    }

    pub async fn adjust_time(&self, user_id: Uuid, hours: i64) -> Result<Profile, DomainError> {
        self.rewards
            .adjust(user_id, ProfileDelta { xp: 0, hours })
            .await
    }

    pub async fn adjust_xp(&self, user_id: Uuid, xp: i64) -> Result<Profile, DomainError> {
        self.rewards
            .adjust(user_id, ProfileDelta { xp, hours: 0 })
            .await
    }

    pub async fn list_active_missions(&self) -> Result<Vec<Mission>, DomainError> {
        self.deps
            .store(
                "missions.list_active",
                self.deps.missions.list_active_missions(),
            )
            .await
    }

    pub async fn list_completed_missions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<CompletedMission>, DomainError> {
        self.deps
            .store(
                "missions.list_completions",
                self.deps.missions.list_completions(user_id),
            )
            .await
    }

    #[instrument(name = "time_engine.service.create_mission", skip(self), fields(title = %new.title))]
    pub async fn create_mission(&self, new: NewMission) -> Result<Mission, DomainError> {
        let title = new.title.trim().to_string();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(
                "title",
                format!("must be 1..={MAX_TITLE_LEN} characters"),
            ));
        }
        if new.mission_type.trim().is_empty() {
            return Err(DomainError::validation("mission_type", "must not be empty"));
        }
        if new.xp_reward < 0 {
            return Err(DomainError::validation("xp_reward", "must not be negative"));
        }

        let mission = Mission {
            id: Uuid::new_v4(),
            title,
            description: new.description,
            mission_type: new.mission_type.trim().to_string(),
            time_reward: new.time_reward,
            xp_reward: new.xp_reward,
            is_active: new.is_active,
            created_at: self.deps.clock.now(),
        };
        self.deps
            .store(
                "missions.insert",
                self.deps.missions.insert_mission(mission.clone()),
            )
            .await?;
        info!(mission_id = %mission.id, "mission created");
        Ok(mission)
    }

    /// Question whose active date is today (UTC).
    pub async fn question_for_today(&self) -> Result<Option<QuestionOfTheDay>, DomainError> {
        let today = self.deps.clock.now().date_naive();
        self.deps
            .store(
                "questions.find_for_date",
                self.deps.questions.find_question_for_date(today),
            )
            .await
    }

    #[instrument(name = "time_engine.service.create_question", skip(self, new), fields(date = %new.active_date))]
    pub async fn create_question(&self, new: NewQuestion) -> Result<QuestionOfTheDay, DomainError> {
        let text = new.question.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::validation("question", "must not be empty"));
        }
        let question = QuestionOfTheDay {
            id: Uuid::new_v4(),
            question: text,
            active_date: new.active_date,
            created_at: self.deps.clock.now(),
        };
        self.deps
            .store(
                "questions.insert",
                self.deps.questions.insert_question(question.clone()),
            )
            .await?;
        Ok(question)
    }

    pub async fn has_responded(&self, user_id: Uuid, question_id: Uuid) -> Result<bool, DomainError> {
        self.deps
            .store(
                "questions.has_responded",
                self.deps.questions.has_responded(user_id, question_id),
            )
            .await
    }
}
