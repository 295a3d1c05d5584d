use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Transport-agnostic domain event.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeDomainEvent {
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
