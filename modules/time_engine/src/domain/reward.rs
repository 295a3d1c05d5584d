use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    MissionCompletion, MissionReward, Profile, QuestionResponse, ResponseOutcome,
};
use crate::domain::error::DomainError;
use crate::domain::events::TimeDomainEvent;
use crate::domain::repo::{CompletionOutcome, ProfileDelta};
use crate::domain::EngineDeps;

pub const XP_PER_LEVEL: i64 = 1000;

/// `floor(xp / 1000) + 1`, with negative XP treated as zero.
pub fn level_for_xp(xp: i64) -> i32 {
    let level = xp.max(0) / XP_PER_LEVEL + 1;
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// Sentences are the non-blank fragments between `.`, `!` and `?`.
pub fn count_sentences(text: &str) -> usize {
    text.split(&['.', '!', '?'][..])
        .filter(|fragment| !fragment.trim().is_empty())
        .count()
}

#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub response_bonus_hours: i64,
    pub response_min_sentences: usize,
}

/// Applies mission and response rewards as atomic deltas.
#[derive(Clone)]
pub struct RewardEngine {
    deps: EngineDeps,
    config: RewardConfig,
}

impl RewardEngine {
    pub fn new(deps: EngineDeps, config: RewardConfig) -> Self {
        Self { deps, config }
    }

    #[instrument(
        name = "time_engine.reward.complete_mission",
        skip(self),
        fields(user_id = %user_id, mission_id = %mission_id)
    )]
    pub async fn complete_mission(
        &self,
        user_id: Uuid,
        mission_id: Uuid,
    ) -> Result<MissionReward, DomainError> {
        let mission = self
            .deps
            .store("missions.find", self.deps.missions.find_mission(mission_id))
            .await?
            .ok_or_else(|| DomainError::mission_not_found(mission_id))?;
        if !mission.is_active {
            return Err(DomainError::mission_inactive(mission_id));
        }
        if mission.xp_reward < 0 {
            return Err(DomainError::validation(
                "xp_reward",
                format!("mission {mission_id} carries a negative XP reward"),
            ));
        }
        if self
            .deps
            .store(
                "missions.has_completed",
                self.deps.missions.has_completed(user_id, mission_id),
            )
            .await?
        {
            return Err(DomainError::already_completed(user_id, mission_id));
        }

        let now = self.deps.clock.now();
        let completion = MissionCompletion {
            id: Uuid::new_v4(),
            user_id,
            mission_id,
            completed_at: now,
        };
        let delta = ProfileDelta {
            xp: mission.xp_reward,
            hours: mission.time_reward,
        };
        let profile = match self
            .deps
            .store(
                "missions.complete",
                self.deps.missions.complete_mission(completion, delta),
            )
            .await?
        {
            CompletionOutcome::Completed(profile) => profile,
            // Lost a race against a concurrent completion of the same mission.
            CompletionOutcome::AlreadyCompleted => {
                return Err(DomainError::already_completed(user_id, mission_id))
            }
            CompletionOutcome::ProfileMissing => return Err(DomainError::profile_not_found(user_id)),
        };

        let leveled_up = profile.level > level_for_xp(profile.xp_points - mission.xp_reward);
        self.deps.events.publish(&TimeDomainEvent::MissionCompleted {
            user_id,
            mission_id,
            xp: mission.xp_reward,
            hours: mission.time_reward,
            at: now,
        });
        info!(
            xp = profile.xp_points,
            level = profile.level,
            balance = profile.time_balance,
            "mission completed"
        );
        Ok(MissionReward {
            profile,
            mission_id,
            xp_awarded: mission.xp_reward,
            time_awarded: mission.time_reward,
            leveled_up,
        })
    }

    /// Stores the response, then credits the bonus when it is long enough.
    /// A failed credit is logged and reported as `bonus_hours == 0`.
    #[instrument(
        name = "time_engine.reward.submit_response",
        skip(self, text),
        fields(user_id = %user_id, question_id = %question_id)
    )]
    pub async fn submit_response(
        &self,
        user_id: Uuid,
        question_id: Uuid,
        text: String,
    ) -> Result<ResponseOutcome, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation("response", "must not be empty"));
        }
        self.deps
            .store(
                "questions.find",
                self.deps.questions.find_question(question_id),
            )
            .await?
            .ok_or_else(|| DomainError::question_not_found(question_id))?;

        let sentences = count_sentences(&text);
        let now = self.deps.clock.now();
        let response = QuestionResponse {
            id: Uuid::new_v4(),
            user_id,
            question_id,
            response: text,
            sentences_count: i32::try_from(sentences).unwrap_or(i32::MAX),
            created_at: now,
        };
        self.deps
            .store(
                "questions.insert_response",
                self.deps.questions.insert_response(response.clone()),
            )
            .await?;

        if sentences < self.config.response_min_sentences {
            info!(sentences, "response stored without bonus");
            return Ok(ResponseOutcome {
                response,
                bonus_hours: 0,
                profile: None,
            });
        }

        let delta = ProfileDelta {
            xp: 0,
            hours: self.config.response_bonus_hours,
        };
        let credited = self
            .deps
            .store(
                "profiles.apply_delta",
                self.deps.profiles.apply_delta(user_id, delta, now),
            )
            .await;
        match credited {
            Ok(Some(profile)) => {
                self.deps.events.publish(&TimeDomainEvent::ResponseRewarded {
                    user_id,
                    question_id,
                    hours: delta.hours,
                    at: now,
                });
                info!(sentences, hours = delta.hours, "response bonus credited");
                Ok(ResponseOutcome {
                    response,
                    bonus_hours: delta.hours,
                    profile: Some(profile),
                })
            }
            Ok(None) => {
                warn!("response stored but profile is missing; bonus not credited");
                Ok(ResponseOutcome {
                    response,
                    bonus_hours: 0,
                    profile: None,
                })
            }
            Err(e) => {
                warn!(error = %e, "response stored but bonus credit failed");
                Ok(ResponseOutcome {
                    response,
                    bonus_hours: 0,
                    profile: None,
                })
            }
        }
    }

    /// Privileged relative adjustment; both counters clamp at zero.
    #[instrument(name = "time_engine.reward.adjust", skip(self), fields(user_id = %user_id))]
    pub async fn adjust(&self, user_id: Uuid, delta: ProfileDelta) -> Result<Profile, DomainError> {
        let now = self.deps.clock.now();
        let profile = self
            .deps
            .store(
                "profiles.apply_delta",
                self.deps.profiles.apply_delta(user_id, delta, now),
            )
            .await?
            .ok_or_else(|| DomainError::profile_not_found(user_id))?;
        info!(
            xp_delta = delta.xp,
            hours_delta = delta.hours,
            balance = profile.time_balance,
            xp = profile.xp_points,
            "profile adjusted"
        );
        Ok(profile)
    }
}
