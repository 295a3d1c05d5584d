use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::{Condition, Expr, Query, SelectStatement};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::info;

use crate::domain::ports::StreakRoutine;
use crate::infra::storage::entity::{profile, response, user_mission};

/// Streak routine run against the profiles table.
///
/// Profiles that completed a mission or answered a question in the last 24
/// hours extend their streak by one day; everyone else drops back to zero.
/// Decay writes move `last_active` too, so it is not used as the activity
/// signal here. Both statements share a transaction.
pub struct SqlStreakRoutine<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SqlStreakRoutine<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Users with a mission completion or a question response at or after `cutoff`.
fn active_user_sets(cutoff: DateTime<Utc>) -> (SelectStatement, SelectStatement) {
    let missions = Query::select()
        .column(user_mission::Column::UserId)
        .from(user_mission::Entity)
        .and_where(user_mission::Column::CompletedAt.gte(cutoff))
        .to_owned();
    let responses = Query::select()
        .column(response::Column::UserId)
        .from(response::Entity)
        .and_where(response::Column::CreatedAt.gte(cutoff))
        .to_owned();
    (missions, responses)
}

#[async_trait]
impl<C> StreakRoutine for SqlStreakRoutine<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn update_streaks(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let (missions, responses) = active_user_sets(now - Duration::hours(24));
        let txn = self.conn.begin().await.context("streaks begin failed")?;

        let extended = profile::Entity::update_many()
            .col_expr(
                profile::Column::StreakDays,
                Expr::col(profile::Column::StreakDays).add(1),
            )
            .filter(
                Condition::any()
                    .add(profile::Column::Id.in_subquery(missions.clone()))
                    .add(profile::Column::Id.in_subquery(responses.clone())),
            )
            .exec(&txn)
            .await
            .context("streak extend failed")?
            .rows_affected;

        let reset = profile::Entity::update_many()
            .col_expr(profile::Column::StreakDays, Expr::value(0))
            .filter(profile::Column::Id.not_in_subquery(missions))
            .filter(profile::Column::Id.not_in_subquery(responses))
            .filter(profile::Column::StreakDays.ne(0))
            .exec(&txn)
            .await
            .context("streak reset failed")?
            .rows_affected;

        txn.commit().await.context("streaks commit failed")?;
        info!(extended, reset, "streaks recomputed");
        Ok(extended + reset)
    }
}
