use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{
    BalanceSnapshot, CompletedMission, Mission, MissionReward, NewMission, NewQuestion, Profile,
    QuestionOfTheDay, RankedProfile, ReconcileSummary, ResponseOutcome, Timeframe,
};
use crate::domain::events::TimeDomainEvent;

/// REST DTO for a stored profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileDto {
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

/// Profile with the decayed display balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceDto {
    #[serde(flatten)]
    pub profile: ProfileDto,
    /// Hours, two decimals.
    pub balance: f64,
    pub low_balance: bool,
    pub is_default: bool,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProfileReq {
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankDto {
    pub user_id: Uuid,
    pub rank: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MissionDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub mission_type: String,
    pub time_reward: i64,
    pub xp_reward: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateMissionReq {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_mission_type")]
    pub mission_type: String,
    /// Signed: missions may cost time.
    #[serde(default)]
    pub time_reward: i64,
    #[serde(default)]
    pub xp_reward: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_mission_type() -> String {
    "daily".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompletedMissionDto {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub mission: Option<MissionDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MissionRewardDto {
    pub mission_id: Uuid,
    pub xp_awarded: i64,
    pub time_awarded: i64,
    pub leveled_up: bool,
    pub profile: ProfileDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionDto {
    pub id: Uuid,
    pub question: String,
    pub active_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Present when the caller is identified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_responded: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateQuestionReq {
    pub question: String,
    pub active_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponseReq {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResponseOutcomeDto {
    pub id: Uuid,
    pub question_id: Uuid,
    pub sentences_count: i32,
    pub bonus_hours: i64,
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TimeframeDto {
    Daily,
    Weekly,
    #[default]
    AllTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardParams {
    #[serde(default)]
    pub timeframe: TimeframeDto,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankedProfileDto {
    pub rank: u32,
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub xp_points: i64,
    pub level: i32,
    pub streak_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileSummaryDto {
    pub profiles_updated: usize,
    pub profiles_failed: usize,
    pub streaks_updated: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Signed relative adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdjustReq {
    pub delta: i64,
}

/// Transport-level event pushed over SSE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeEvent {
    BalanceDecayed {
        user_id: Uuid,
        hours: i64,
        balance: i64,
        at: DateTime<Utc>,
    },
    MissionCompleted {
        user_id: Uuid,
        mission_id: Uuid,
        xp: i64,
        hours: i64,
        at: DateTime<Utc>,
    },
    ResponseRewarded {
        user_id: Uuid,
        question_id: Uuid,
        hours: i64,
        at: DateTime<Utc>,
    },
    ReconcileFinished {
        profiles_updated: usize,
        at: DateTime<Utc>,
    },
}

impl From<Profile> for ProfileDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            username: p.username,
            avatar_url: p.avatar_url,
            time_balance: p.time_balance,
            xp_points: p.xp_points,
            level: p.level,
            streak_days: p.streak_days,
            last_active: p.last_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<BalanceSnapshot> for BalanceDto {
    fn from(s: BalanceSnapshot) -> Self {
        Self {
            profile: s.profile.into(),
            balance: s.balance,
            low_balance: s.low_balance,
            is_default: s.is_default,
            as_of: s.as_of,
        }
    }
}

impl From<Mission> for MissionDto {
    fn from(m: Mission) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            mission_type: m.mission_type,
            time_reward: m.time_reward,
            xp_reward: m.xp_reward,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

impl From<CreateMissionReq> for NewMission {
    fn from(req: CreateMissionReq) -> Self {
        Self {
            title: req.title,
            description: req.description,
            mission_type: req.mission_type,
            time_reward: req.time_reward,
            xp_reward: req.xp_reward,
            is_active: req.is_active,
        }
    }
}

impl From<CompletedMission> for CompletedMissionDto {
    fn from(c: CompletedMission) -> Self {
        Self {
            id: c.completion.id,
            mission_id: c.completion.mission_id,
            completed_at: c.completion.completed_at,
            mission: c.mission.map(Into::into),
        }
    }
}

impl From<MissionReward> for MissionRewardDto {
    fn from(r: MissionReward) -> Self {
        Self {
            mission_id: r.mission_id,
            xp_awarded: r.xp_awarded,
            time_awarded: r.time_awarded,
            leveled_up: r.leveled_up,
            profile: r.profile.into(),
        }
    }
}

impl From<QuestionOfTheDay> for QuestionDto {
    fn from(q: QuestionOfTheDay) -> Self {
        Self {
            id: q.id,
            question: q.question,
            active_date: q.active_date,
            created_at: q.created_at,
            has_responded: None,
        }
    }
}

impl From<CreateQuestionReq> for NewQuestion {
    fn from(req: CreateQuestionReq) -> Self {
        Self {
            question: req.question,
            active_date: req.active_date,
        }
    }
}

impl From<ResponseOutcome> for ResponseOutcomeDto {
    fn from(o: ResponseOutcome) -> Self {
        Self {
            id: o.response.id,
            question_id: o.response.question_id,
            sentences_count: o.response.sentences_count,
            bonus_hours: o.bonus_hours,
            profile: o.profile.map(Into::into),
        }
    }
}

impl From<TimeframeDto> for Timeframe {
    fn from(t: TimeframeDto) -> Self {
        match t {
            TimeframeDto::Daily => Self::Daily,
            TimeframeDto::Weekly => Self::Weekly,
            TimeframeDto::AllTime => Self::AllTime,
        }
    }
}

impl From<RankedProfile> for RankedProfileDto {
    fn from(r: RankedProfile) -> Self {
        Self {
            rank: r.rank,
            id: r.id,
            username: r.username,
            avatar_url: r.avatar_url,
            xp_points: r.xp_points,
            level: r.level,
            streak_days: r.streak_days,
        }
    }
}

impl From<ReconcileSummary> for ReconcileSummaryDto {
    fn from(s: ReconcileSummary) -> Self {
        Self {
            profiles_updated: s.profiles_updated,
            profiles_failed: s.profiles_failed,
            streaks_updated: s.streaks_updated,
            timestamp: s.timestamp,
        }
    }
}

impl From<&TimeDomainEvent> for TimeEvent {
    fn from(e: &TimeDomainEvent) -> Self {
        match *e {
            TimeDomainEvent::BalanceDecayed {
                user_id,
                hours,
                balance,
                at,
            } => Self::BalanceDecayed {
                user_id,
                hours,
                balance,
                at,
            },
            TimeDomainEvent::MissionCompleted {
                user_id,
                mission_id,
                xp,
                hours,
                at,
            } => Self::MissionCompleted {
                user_id,
                mission_id,
                xp,
                hours,
                at,
            },
            TimeDomainEvent::ResponseRewarded {
                user_id,
                question_id,
                hours,
                at,
            } => Self::ResponseRewarded {
                user_id,
                question_id,
                hours,
                at,
            },
            TimeDomainEvent::ReconcileFinished {
                profiles_updated,
                at,
            } => Self::ReconcileFinished {
                profiles_updated,
                at,
            },
        }
    }
}
