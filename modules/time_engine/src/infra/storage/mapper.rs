use sea_orm::Set;

use crate::contract::model::{
    Mission, MissionCompletion, Profile, QuestionOfTheDay, QuestionResponse,
};
use crate::infra::storage::entity::{mission, profile, question, response, user_mission};

impl From<profile::Model> for Profile {
    fn from(m: profile::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            avatar_url: m.avatar_url,
            time_balance: m.time_balance,
            xp_points: m.xp_points,
            level: m.level,
            streak_days: m.streak_days,
            last_active: m.last_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<Profile> for profile::ActiveModel {
    fn from(p: Profile) -> Self {
        Self {
            id: Set(p.id),
            username: Set(p.username),
            avatar_url: Set(p.avatar_url),
            time_balance: Set(p.time_balance),
            xp_points: Set(p.xp_points),
            level: Set(p.level),
            streak_days: Set(p.streak_days),
            last_active: Set(p.last_active),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        }
    }
}

impl From<mission::Model> for Mission {
    fn from(m: mission::Model) -> Self {
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

impl From<Mission> for mission::ActiveModel {
    fn from(m: Mission) -> Self {
        Self {
            id: Set(m.id),
            title: Set(m.title),
            description: Set(m.description),
            mission_type: Set(m.mission_type),
            time_reward: Set(m.time_reward),
            xp_reward: Set(m.xp_reward),
            is_active: Set(m.is_active),
            created_at: Set(m.created_at),
        }
    }
}

impl From<user_mission::Model> for MissionCompletion {
    fn from(m: user_mission::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            mission_id: m.mission_id,
            completed_at: m.completed_at,
        }
    }
}

impl From<MissionCompletion> for user_mission::ActiveModel {
    fn from(c: MissionCompletion) -> Self {
        Self {
            id: Set(c.id),
            user_id: Set(c.user_id),
            mission_id: Set(c.mission_id),
            completed_at: Set(c.completed_at),
        }
    }
}

impl From<question::Model> for QuestionOfTheDay {
    fn from(m: question::Model) -> Self {
        Self {
            id: m.id,
            question: m.question,
            active_date: m.active_date,
            created_at: m.created_at,
        }
    }
}

impl From<QuestionOfTheDay> for question::ActiveModel {
    fn from(q: QuestionOfTheDay) -> Self {
        Self {
            id: Set(q.id),
            question: Set(q.question),
            active_date: Set(q.active_date),
            created_at: Set(q.created_at),
        }
    }
}

impl From<QuestionResponse> for response::ActiveModel {
    fn from(r: QuestionResponse) -> Self {
        Self {
            id: Set(r.id),
            user_id: Set(r.user_id),
            question_id: Set(r.question_id),
            response: Set(r.response),
            sentences_count: Set(r.sentences_count),
            created_at: Set(r.created_at),
        }
    }
}
