mod common;

use chrono::Duration;
use common::{mission, profile, t0};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use time_engine::contract::model::{MissionCompletion, QuestionResponse};
use time_engine::domain::ports::StreakRoutine;
use time_engine::domain::repo::{
    CompletionOutcome, DecayUpdate, MissionRepository, ProfileDelta, ProfileRepository,
    QuestionRepository,
};
use time_engine::infra::storage::migrations::Migrator;
use time_engine::infra::storage::SeaOrmStore;
use time_engine::infra::streaks::SqlStreakRoutine;
use uuid::Uuid;

async fn sqlite() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

fn completion(user_id: Uuid, mission_id: Uuid) -> MissionCompletion {
    MissionCompletion {
        id: Uuid::new_v4(),
        user_id,
        mission_id,
        completed_at: t0(),
    }
}

#[tokio::test]
async fn profile_roundtrip_and_duplicate_insert() {
    let store = SeaOrmStore::new(sqlite().await);
    let p = profile(336, 0, Some(t0()));

    assert!(store.insert_profile(p.clone()).await.unwrap());
    assert!(!store.insert_profile(p.clone()).await.unwrap());
    let found = store.find_profile(p.id).await.unwrap().unwrap();
    assert_eq!(found, p);
}

#[tokio::test]
async fn deltas_clamp_and_recompute_level() {
    let store = SeaOrmStore::new(sqlite().await);
    let p = profile(5, 900, Some(t0()));
    store.insert_profile(p.clone()).await.unwrap();

    let later = t0() + Duration::minutes(5);
    let up = store
        .apply_delta(p.id, ProfileDelta { xp: 150, hours: -9 }, later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(up.xp_points, 1050);
    assert_eq!(up.level, 2);
    assert_eq!(up.time_balance, 0);
    assert_eq!(up.last_active, Some(later));

    let down = store
        .apply_delta(p.id, ProfileDelta { xp: -5000, hours: 3 }, later)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(down.xp_points, 0);
    assert_eq!(down.level, 1);
    assert_eq!(down.time_balance, 3);

    assert!(store
        .apply_delta(Uuid::new_v4(), ProfileDelta::default(), later)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn decay_is_guarded_by_observed_timestamp() {
    let store = SeaOrmStore::new(sqlite().await);
    let last = t0() - Duration::hours(3);
    let p = profile(10, 0, Some(last));
    store.insert_profile(p.clone()).await.unwrap();

    let stale = DecayUpdate {
        id: p.id,
        hours: 3,
        observed_last_active: Some(last - Duration::hours(1)),
        new_last_active: t0(),
    };
    assert!(store.apply_decay(&stale).await.unwrap().is_none());

    let fresh = DecayUpdate {
        observed_last_active: Some(last),
        ..stale
    };
    let after = store.apply_decay(&fresh).await.unwrap().unwrap();
    assert_eq!(after.time_balance, 7);
    assert_eq!(after.last_active, Some(t0()));

    // Replaying the same update no longer matches.
    assert_eq!(store.apply_decay_batch(&[fresh]).await.unwrap(), 0);
}

#[tokio::test]
async fn completion_is_unique_per_user_and_mission() {
    let store = SeaOrmStore::new(sqlite().await);
    let p = profile(10, 0, Some(t0()));
    let m = mission(2, 40);
    store.insert_profile(p.clone()).await.unwrap();
    store.insert_mission(m.clone()).await.unwrap();
    let delta = ProfileDelta { xp: 40, hours: 2 };

    let first = store
        .complete_mission(completion(p.id, m.id), delta)
        .await
        .unwrap();
    assert!(matches!(first, CompletionOutcome::Completed(ref p) if p.xp_points == 40));

    let second = store
        .complete_mission(completion(p.id, m.id), delta)
        .await
        .unwrap();
    assert_eq!(second, CompletionOutcome::AlreadyCompleted);

    let stored = store.find_profile(p.id).await.unwrap().unwrap();
    assert_eq!(stored.xp_points, 40);
    assert_eq!(stored.time_balance, 12);
    assert!(store.has_completed(p.id, m.id).await.unwrap());

    let done = store.list_completions(p.id).await.unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].mission.as_ref().unwrap().id, m.id);
}

#[tokio::test]
async fn completion_for_missing_profile_rolls_back() {
    let store = SeaOrmStore::new(sqlite().await);
    let m = mission(2, 40);
    store.insert_mission(m.clone()).await.unwrap();
    let ghost = Uuid::new_v4();

    let outcome = store
        .complete_mission(completion(ghost, m.id), ProfileDelta::default())
        .await
        .unwrap();
    assert_eq!(outcome, CompletionOutcome::ProfileMissing);
    assert!(!store.has_completed(ghost, m.id).await.unwrap());
}

#[tokio::test]
async fn active_missions_newest_first() {
    let store = SeaOrmStore::new(sqlite().await);
    let mut old = mission(1, 1);
    old.created_at = t0() - Duration::days(2);
    let new = mission(1, 1);
    let mut hidden = mission(1, 1);
    hidden.is_active = false;
    for m in [&old, &new, &hidden] {
        store.insert_mission(m.clone()).await.unwrap();
    }

    let ids: Vec<_> = store
        .list_active_missions()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[tokio::test]
async fn ranking_queries() {
    let store = SeaOrmStore::new(sqlite().await);
    for (xp, hours_ago) in [(100, 1), (500, 30), (900, 24 * 10)] {
        store
            .insert_profile(profile(1, xp, Some(t0() - Duration::hours(hours_ago))))
            .await
            .unwrap();
    }
    assert_eq!(store.count_with_more_xp(100).await.unwrap(), 2);
    assert_eq!(store.count_with_more_xp(900).await.unwrap(), 0);
    let daily = store
        .list_profiles(Some(t0() - Duration::hours(24)))
        .await
        .unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(store.list_profiles(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn streaks_follow_recent_activity() {
    let db = sqlite().await;
    let store = SeaOrmStore::new(db.clone());
    let streaks = SqlStreakRoutine::new(db);

    let mut busy = profile(10, 0, Some(t0()));
    busy.streak_days = 2;
    let mut idle = profile(10, 0, Some(t0()));
    idle.streak_days = 9;
    let fresh = profile(10, 0, Some(t0()));
    for p in [&busy, &idle, &fresh] {
        store.insert_profile(p.clone()).await.unwrap();
    }
    let m = mission(1, 1);
    store.insert_mission(m.clone()).await.unwrap();
    store
        .complete_mission(completion(busy.id, m.id), ProfileDelta::default())
        .await
        .unwrap();
    store
        .insert_response(QuestionResponse {
            id: Uuid::new_v4(),
            user_id: fresh.id,
            question_id: Uuid::new_v4(),
            response: "Yes.".into(),
            sentences_count: 1,
            created_at: t0() - Duration::hours(1),
        })
        .await
        .unwrap();

    let touched = streaks
        .update_streaks(t0() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(touched, 3);

    let streak = |id| {
        let store = &store;
        async move { store.find_profile(id).await.unwrap().unwrap().streak_days }
    };
    assert_eq!(streak(busy.id).await, 3);
    assert_eq!(streak(idle.id).await, 0);
    assert_eq!(streak(fresh.id).await, 1);
}
