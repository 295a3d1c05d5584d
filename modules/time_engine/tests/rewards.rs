mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{harness, mission, profile, t0};
use time_engine::contract::model::QuestionOfTheDay;
use time_engine::domain::error::DomainError;
use time_engine::domain::events::TimeDomainEvent;
use time_engine::domain::repo::{ProfileRepository, QuestionRepository};
use uuid::Uuid;

#[tokio::test]
async fn mission_rewards_are_credited_once() {
    let h = harness();
    let p = profile(10, 950, Some(t0()));
    let m = mission(4, 100);
    h.store.inner.put_profile(p.clone());
    h.store.inner.put_mission(m.clone());

    let reward = h.service.complete_mission(p.id, m.id).await.unwrap();
    assert_eq!(reward.profile.xp_points, 1050);
    assert_eq!(reward.profile.level, 2);
    assert_eq!(reward.profile.time_balance, 14);
    assert!(reward.leveled_up);

    let err = h.service.complete_mission(p.id, m.id).await.unwrap_err();
    assert!(matches!(err, DomainError::AlreadyCompleted { .. }));
    assert_eq!(h.store.inner.completion_count(), 1);

    let events = h.events.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TimeDomainEvent::MissionCompleted { xp: 100, hours: 4, .. }));
}

#[tokio::test]
async fn costly_mission_clamps_balance_at_zero() {
    let h = harness();
    let p = profile(3, 0, Some(t0()));
    let m = mission(-10, 50);
    h.store.inner.put_profile(p.clone());
    h.store.inner.put_mission(m.clone());

    let reward = h.service.complete_mission(p.id, m.id).await.unwrap();
    assert_eq!(reward.profile.time_balance, 0);
    assert_eq!(reward.time_awarded, -10);
}

#[tokio::test]
async fn unknown_and_inactive_missions_are_rejected() {
    let h = harness();
    let p = profile(3, 0, Some(t0()));
    h.store.inner.put_profile(p.clone());

    let err = h
        .service
        .complete_mission(p.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::MissionNotFound { .. }));

    let mut m = mission(1, 1);
    m.is_active = false;
    h.store.inner.put_mission(m.clone());
    let err = h.service.complete_mission(p.id, m.id).await.unwrap_err();
    assert!(matches!(err, DomainError::MissionInactive { .. }));
    assert_eq!(h.store.inner.completion_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_of_one_mission_credit_once() {
    let h = Arc::new(harness());
    let p = profile(0, 0, Some(t0()));
    let m = mission(2, 10);
    h.store.inner.put_profile(p.clone());
    h.store.inner.put_mission(m.clone());

    let (user_id, mission_id) = (p.id, m.id);
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let h = h.clone();
            tokio::spawn(async move { h.service.complete_mission(user_id, mission_id).await })
        })
        .collect();
    let mut ok = 0;
    for t in tasks {
        match t.await.unwrap() {
            Ok(_) => ok += 1,
            Err(DomainError::AlreadyCompleted { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    let stored = h.store.find_profile(p.id).await.unwrap().unwrap();
    assert_eq!(stored.xp_points, 10);
    assert_eq!(stored.time_balance, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_rewards_sum() {
    let h = Arc::new(harness());
    let p = profile(0, 0, Some(t0()));
    h.store.inner.put_profile(p.clone());
    let missions: Vec<_> = (0..20).map(|_| mission(1, 25)).collect();
    for m in &missions {
        h.store.inner.put_mission(m.clone());
    }

    let user_id = p.id;
    let tasks: Vec<_> = missions
        .iter()
        .map(|m| {
            let h = h.clone();
            let mission_id = m.id;
            tokio::spawn(async move { h.service.complete_mission(user_id, mission_id).await })
        })
        .collect();
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    let stored = h.store.find_profile(p.id).await.unwrap().unwrap();
    assert_eq!(stored.xp_points, 500);
    assert_eq!(stored.time_balance, 20);
    assert_eq!(stored.level, 1);
}

async fn seed_question(h: &common::Harness) -> QuestionOfTheDay {
    let q = QuestionOfTheDay {
        id: Uuid::new_v4(),
        question: "What did you build today?".into(),
        active_date: t0().date_naive(),
        created_at: t0(),
    };
    h.store.insert_question(q.clone()).await.unwrap();
    q
}

#[tokio::test]
async fn three_sentences_earn_the_bonus() {
    let h = harness();
    let p = profile(10, 0, Some(t0() - Duration::minutes(5)));
    h.store.inner.put_profile(p.clone());
    let q = seed_question(&h).await;

    let outcome = h
        .service
        .submit_response(p.id, q.id, "Hello. World! How are you?".into())
        .await
        .unwrap();
    assert_eq!(outcome.bonus_hours, 6);
    assert_eq!(outcome.response.sentences_count, 3);
    assert_eq!(outcome.profile.unwrap().time_balance, 16);
    assert!(h.service.has_responded(p.id, q.id).await.unwrap());
}

#[tokio::test]
async fn short_response_is_stored_without_bonus() {
    let h = harness();
    let p = profile(10, 0, Some(t0()));
    h.store.inner.put_profile(p.clone());
    let q = seed_question(&h).await;

    let outcome = h
        .service
        .submit_response(p.id, q.id, "Hello.".into())
        .await
        .unwrap();
    assert_eq!(outcome.bonus_hours, 0);
    assert!(outcome.profile.is_none());
    assert_eq!(h.store.inner.response_count(), 1);
    let stored = h.store.find_profile(p.id).await.unwrap().unwrap();
    assert_eq!(stored.time_balance, 10);
}

#[tokio::test]
async fn response_validation() {
    let h = harness();
    let p = profile(10, 0, Some(t0()));
    h.store.inner.put_profile(p.clone());

    let err = h
        .service
        .submit_response(p.id, Uuid::new_v4(), "   ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let err = h
        .service
        .submit_response(p.id, Uuid::new_v4(), "A. B. C.".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::QuestionNotFound { .. }));
    assert_eq!(h.store.inner.response_count(), 0);
}

#[tokio::test]
async fn admin_adjustments_clamp_and_relevel() {
    let h = harness();
    let p = profile(5, 1500, Some(t0()));
    h.store.inner.put_profile(p.clone());

    let after = h.service.adjust_time(p.id, -8).await.unwrap();
    assert_eq!(after.time_balance, 0);

    let after = h.service.adjust_xp(p.id, -600).await.unwrap();
    assert_eq!(after.xp_points, 900);
    assert_eq!(after.level, 1);

    let err = h.service.adjust_xp(Uuid::new_v4(), 10).await.unwrap_err();
    assert!(matches!(err, DomainError::ProfileNotFound { .. }));
}

#[tokio::test]
async fn todays_question_follows_the_clock() {
    let h = harness();
    assert!(h.service.question_for_today().await.unwrap().is_none());
    let q = seed_question(&h).await;
    assert_eq!(h.service.question_for_today().await.unwrap().unwrap().id, q.id);
    h.clock.set(t0() + Duration::days(1));
    assert!(h.service.question_for_today().await.unwrap().is_none());
}
