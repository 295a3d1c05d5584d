//! SeaORM-backed implementation of the store ports.
//!
//! Every balance or XP change is written as a relative SQL expression against
//! the row as it is at write time, so concurrent writers compose instead of
//! overwriting each other. Generic over the connection so tests can run
//! against in-memory SQLite and production against Postgres.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{
    CompletedMission, Mission, MissionCompletion, Profile, QuestionOfTheDay, QuestionResponse,
};
use crate::domain::repo::{
    CompletionOutcome, DecayCandidate, DecayUpdate, MissionRepository, ProfileDelta,
    ProfileRepository, QuestionRepository,
};
use crate::domain::reward::XP_PER_LEVEL;
use crate::infra::storage::entity::{mission, profile, question, response, user_mission};

/// SeaORM store impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// `CASE WHEN expr < 0 THEN 0 ELSE expr END`
pub(crate) fn clamp_at_zero(expr: SimpleExpr) -> SimpleExpr {
    Expr::case(Expr::expr(expr.clone()).lt(0i64), 0i64)
        .finally(expr)
        .into()
}

/// Relative update for `delta`. Right-hand sides all see the pre-update row,
/// so `level` is derived from the same clamped XP expression.
fn delta_update(
    delta: ProfileDelta,
    now: DateTime<Utc>,
) -> sea_orm::UpdateMany<profile::Entity> {
    let xp = clamp_at_zero(Expr::col(profile::Column::XpPoints).add(delta.xp));
    let level = Expr::expr(Expr::expr(xp.clone()).div(XP_PER_LEVEL)).add(1i64);
    profile::Entity::update_many()
        .col_expr(profile::Column::XpPoints, xp)
        .col_expr(profile::Column::Level, level)
        .col_expr(
            profile::Column::TimeBalance,
            clamp_at_zero(Expr::col(profile::Column::TimeBalance).add(delta.hours)),
        )
        .col_expr(profile::Column::LastActive, Expr::value(now))
        .col_expr(profile::Column::UpdatedAt, Expr::value(now))
}

async fn decay_one<T: ConnectionTrait>(conn: &T, u: &DecayUpdate) -> Result<u64, DbErr> {
    let guard = match u.observed_last_active {
        Some(seen) => profile::Column::LastActive.eq(seen),
        None => profile::Column::LastActive.is_null(),
    };
    let res = profile::Entity::update_many()
        .col_expr(
            profile::Column::TimeBalance,
            clamp_at_zero(Expr::col(profile::Column::TimeBalance).sub(u.hours)),
        )
        .col_expr(profile::Column::LastActive, Expr::value(u.new_last_active))
        .col_expr(profile::Column::UpdatedAt, Expr::value(u.new_last_active))
        .filter(profile::Column::Id.eq(u.id))
        .filter(guard)
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl<C> ProfileRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let found = profile::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_profile failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert_profile(&self, p: Profile) -> anyhow::Result<bool> {
        let exists = profile::Entity::find_by_id(p.id)
            .count(&self.conn)
            .await
            .context("insert_profile lookup failed")?
            > 0;
        if exists {
            return Ok(false);
        }
        match profile::ActiveModel::from(p).insert(&self.conn).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e).context("insert_profile failed"),
        }
    }

    async fn list_profiles(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Profile>> {
        let mut query = profile::Entity::find();
        if let Some(since) = active_since {
            query = query.filter(profile::Column::LastActive.gte(since));
        }
        let rows = query
            .order_by_asc(profile::Column::CreatedAt)
            .order_by_asc(profile::Column::Id)
            .all(&self.conn)
            .await
            .context("list_profiles failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_decay_candidates(&self) -> anyhow::Result<Vec<DecayCandidate>> {
        let rows: Vec<(Uuid, i64, Option<DateTime<Utc>>)> = profile::Entity::find()
            .select_only()
            .column(profile::Column::Id)
            .column(profile::Column::TimeBalance)
            .column(profile::Column::LastActive)
            .filter(profile::Column::LastActive.is_not_null())
            .order_by_asc(profile::Column::Id)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("list_decay_candidates failed")?;
        Ok(rows
            .into_iter()
            .map(|(id, time_balance, last_active)| DecayCandidate {
                id,
                time_balance,
                last_active,
            })
            .collect())
    }

    async fn apply_decay_batch(&self, batch: &[DecayUpdate]) -> anyhow::Result<usize> {
        let txn = self
            .conn
            .begin()
            .await
            .context("apply_decay_batch begin failed")?;
        let mut applied = 0u64;
        for update in batch {
            applied += decay_one(&txn, update)
                .await
                .with_context(|| format!("apply_decay_batch failed for {}", update.id))?;
        }
        txn.commit()
            .await
            .context("apply_decay_batch commit failed")?;
        debug!(size = batch.len(), applied, "decay chunk committed");
        Ok(usize::try_from(applied).unwrap_or(usize::MAX))
    }

    async fn apply_decay(&self, update: &DecayUpdate) -> anyhow::Result<Option<Profile>> {
        let affected = decay_one(&self.conn, update)
            .await
            .context("apply_decay failed")?;
        if affected == 0 {
            return Ok(None);
        }
        self.find_profile(update.id).await
    }

    async fn apply_delta(
        &self,
        id: Uuid,
        delta: ProfileDelta,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Profile>> {
        let res = delta_update(delta, now)
            .filter(profile::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("apply_delta failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.find_profile(id).await
    }

    async fn count_with_more_xp(&self, xp: i64) -> anyhow::Result<u64> {
        profile::Entity::find()
            .filter(profile::Column::XpPoints.gt(xp))
            .count(&self.conn)
            .await
            .context("count_with_more_xp failed")
    }
}

#[async_trait]
impl<C> MissionRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>> {
        let found = mission::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_mission failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_active_missions(&self) -> anyhow::Result<Vec<Mission>> {
        let rows = mission::Entity::find()
            .filter(mission::Column::IsActive.eq(true))
            .order_by_desc(mission::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list_active_missions failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_mission(&self, m: Mission) -> anyhow::Result<()> {
        let _ = mission::ActiveModel::from(m)
            .insert(&self.conn)
            .await
            .context("insert_mission failed")?;
        Ok(())
    }

    async fn has_completed(&self, user_id: Uuid, mission_id: Uuid) -> anyhow::Result<bool> {
        let count = user_mission::Entity::find()
            .filter(user_mission::Column::UserId.eq(user_id))
            .filter(user_mission::Column::MissionId.eq(mission_id))
            .count(&self.conn)
            .await
            .context("has_completed failed")?;
        Ok(count > 0)
    }

    async fn complete_mission(
        &self,
        completion: MissionCompletion,
        delta: ProfileDelta,
    ) -> anyhow::Result<CompletionOutcome> {
        let user_id = completion.user_id;
        let now = completion.completed_at;
        let txn = self
            .conn
            .begin()
            .await
            .context("complete_mission begin failed")?;

        if let Err(e) = user_mission::ActiveModel::from(completion)
            .insert(&txn)
            .await
        {
            txn.rollback()
                .await
                .context("complete_mission rollback failed")?;
            if is_unique_violation(&e) {
                return Ok(CompletionOutcome::AlreadyCompleted);
            }
            return Err(e).context("complete_mission insert failed");
        }

        let res = delta_update(delta, now)
            .filter(profile::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .context("complete_mission credit failed")?;
        if res.rows_affected == 0 {
            txn.rollback()
                .await
                .context("complete_mission rollback failed")?;
            return Ok(CompletionOutcome::ProfileMissing);
        }

        let updated = profile::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .context("complete_mission reload failed")?;
        txn.commit()
            .await
            .context("complete_mission commit failed")?;
        Ok(match updated {
            Some(p) => CompletionOutcome::Completed(p.into()),
            None => CompletionOutcome::ProfileMissing,
        })
    }

    async fn list_completions(&self, user_id: Uuid) -> anyhow::Result<Vec<CompletedMission>> {
        let rows = user_mission::Entity::find()
            .filter(user_mission::Column::UserId.eq(user_id))
            .order_by_desc(user_mission::Column::CompletedAt)
            .find_also_related(mission::Entity)
            .all(&self.conn)
            .await
            .context("list_completions failed")?;
        Ok(rows
            .into_iter()
            .map(|(completion, mission)| CompletedMission {
                completion: completion.into(),
                mission: mission.map(Into::into),
            })
            .collect())
    }
}

#[async_trait]
impl<C> QuestionRepository for SeaOrmStore<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_question(&self, id: Uuid) -> anyhow::Result<Option<QuestionOfTheDay>> {
        let found = question::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_question failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_question_for_date(
        &self,
        date: NaiveDate,
    ) -> anyhow::Result<Option<QuestionOfTheDay>> {
        let found = question::Entity::find()
            .filter(question::Column::ActiveDate.eq(date))
            .order_by_desc(question::Column::CreatedAt)
            .one(&self.conn)
            .await
            .context("find_question_for_date failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert_question(&self, q: QuestionOfTheDay) -> anyhow::Result<()> {
        let _ = question::ActiveModel::from(q)
            .insert(&self.conn)
            .await
            .context("insert_question failed")?;
        Ok(())
    }

    async fn insert_response(&self, r: QuestionResponse) -> anyhow::Result<()> {
        let _ = response::ActiveModel::from(r)
            .insert(&self.conn)
            .await
            .context("insert_response failed")?;
        Ok(())
    }

    async fn has_responded(&self, user_id: Uuid, question_id: Uuid) -> anyhow::Result<bool> {
        let count = response::Entity::find()
            .filter(response::Column::UserId.eq(user_id))
            .filter(response::Column::QuestionId.eq(question_id))
            .count(&self.conn)
            .await
            .context("has_responded failed")?;
        Ok(count > 0)
    }
}
