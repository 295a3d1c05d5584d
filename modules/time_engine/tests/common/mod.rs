#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use time_engine::config::TimeEngineConfig;
use time_engine::contract::model::{
    CompletedMission, Mission, MissionCompletion, Profile, QuestionOfTheDay, QuestionResponse,
};
use time_engine::domain::events::TimeDomainEvent;
use time_engine::domain::ports::{EventPublisher, StreakRoutine, TimeSource};
use time_engine::domain::repo::{
    CompletionOutcome, DecayCandidate, DecayUpdate, MissionRepository, ProfileDelta,
    ProfileRepository, QuestionRepository,
};
use time_engine::domain::service::Service;
use time_engine::domain::EngineDeps;
use time_engine::infra::storage::InMemoryStore;

/// 2025-06-01 10:00:00 UTC; not midnight, so streaks stay out of the way.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

/// Manually driven wall clock.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock() = now;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

#[derive(Default)]
pub struct RecordingPublisher(Mutex<Vec<TimeDomainEvent>>);

impl RecordingPublisher {
    pub fn events(&self) -> Vec<TimeDomainEvent> {
        self.0.lock().clone()
    }
}

impl EventPublisher<TimeDomainEvent> for RecordingPublisher {
    fn publish(&self, event: &TimeDomainEvent) {
        self.0.lock().push(event.clone());
    }
}

pub fn profile(balance: i64, xp: i64, last_active: Option<DateTime<Utc>>) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        username: format!("user-{}", &Uuid::new_v4().simple().to_string()[..6]),
        avatar_url: None,
        time_balance: balance,
        xp_points: xp,
        level: (xp / 1000 + 1) as i32,
        streak_days: 0,
        last_active,
        created_at: t0(),
        updated_at: t0(),
    }
}

pub fn mission(time_reward: i64, xp_reward: i64) -> Mission {
    Mission {
        id: Uuid::new_v4(),
        title: "Touch grass".into(),
        description: None,
        mission_type: "daily".into(),
        time_reward,
        xp_reward,
        is_active: true,
        created_at: t0(),
    }
}

/// Wraps the in-memory store and injects failures on demand.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    /// 1-based `apply_decay_batch` call numbers that fail.
    pub failing_batches: Mutex<Vec<usize>>,
    batch_calls: AtomicUsize,
    /// Streak calls that fail before one succeeds.
    pub streak_failures: AtomicUsize,
    pub streak_calls: AtomicUsize,
    /// Stalls every `find_profile`.
    pub stall: Mutex<Option<Duration>>,
}

#[async_trait]
impl ProfileRepository for FlakyStore {
    async fn find_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let stall = *self.stall.lock();
        if let Some(d) = stall {
            tokio::time::sleep(d).await;
        }
        self.inner.find_profile(id).await
    }

    async fn insert_profile(&self, profile: Profile) -> anyhow::Result<bool> {
        self.inner.insert_profile(profile).await
    }

    async fn list_profiles(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Profile>> {
        self.inner.list_profiles(active_since).await
    }

    async fn list_decay_candidates(&self) -> anyhow::Result<Vec<DecayCandidate>> {
        self.inner.list_decay_candidates().await
    }

    async fn apply_decay_batch(&self, batch: &[DecayUpdate]) -> anyhow::Result<usize> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_batches.lock().contains(&call) {
            anyhow::bail!("injected failure on batch {call}");
        }
        self.inner.apply_decay_batch(batch).await
    }

    async fn apply_decay(&self, update: &DecayUpdate) -> anyhow::Result<Option<Profile>> {
        self.inner.apply_decay(update).await
    }

    async fn apply_delta(
        &self,
        id: Uuid,
        delta: ProfileDelta,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Profile>> {
        self.inner.apply_delta(id, delta, now).await
    }

    async fn count_with_more_xp(&self, xp: i64) -> anyhow::Result<u64> {
        self.inner.count_with_more_xp(xp).await
    }
}

#[async_trait]
impl MissionRepository for FlakyStore {
    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>> {
        self.inner.find_mission(id).await
    }

    async fn list_active_missions(&self) -> anyhow::Result<Vec<Mission>> {
        self.inner.list_active_missions().await
    }

    async fn insert_mission(&self, mission: Mission) -> anyhow::Result<()> {
        self.inner.insert_mission(mission).await
    }

    async fn has_completed(&self, user_id: Uuid, mission_id: Uuid) -> anyhow::Result<bool> {
        self.inner.has_completed(user_id, mission_id).await
    }

    async fn complete_mission(
        &self,
        completion: MissionCompletion,
        delta: ProfileDelta,
    ) -> anyhow::Result<CompletionOutcome> {
        self.inner.complete_mission(completion, delta).await
    }

    async fn list_completions(&self, user_id: Uuid) -> anyhow::Result<Vec<CompletedMission>> {
        self.inner.list_completions(user_id).await
    }
}

#[async_trait]
impl QuestionRepository for FlakyStore {
    async fn find_question(&self, id: Uuid) -> anyhow::Result<Option<QuestionOfTheDay>> {
        self.inner.find_question(id).await
    }

    async fn find_question_for_date(
        &self,
        date: chrono::NaiveDate,
    ) -> anyhow::Result<Option<QuestionOfTheDay>> {
        self.inner.find_question_for_date(date).await
    }

    async fn insert_question(&self, question: QuestionOfTheDay) -> anyhow::Result<()> {
        self.inner.insert_question(question).await
    }

    async fn insert_response(&self, response: QuestionResponse) -> anyhow::Result<()> {
        self.inner.insert_response(response).await
    }

    async fn has_responded(&self, user_id: Uuid, question_id: Uuid) -> anyhow::Result<bool> {
        self.inner.has_responded(user_id, question_id).await
    }
}

#[async_trait]
impl StreakRoutine for FlakyStore {
    async fn update_streaks(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        self.streak_calls.fetch_add(1, Ordering::SeqCst);
        let left = self.streak_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.streak_failures.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("injected streak failure");
        }
        self.inner.update_streaks(now).await
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingPublisher>,
    pub service: Service,
}

pub fn harness_with(config: TimeEngineConfig, now: DateTime<Utc>) -> Harness {
    let store = Arc::new(FlakyStore::default());
    let clock = FixedClock::at(now);
    let events = Arc::new(RecordingPublisher::default());
    let deps = EngineDeps {
        profiles: store.clone(),
        missions: store.clone(),
        questions: store.clone(),
        streaks: store.clone(),
        events: events.clone(),
        clock: clock.clone(),
        store_timeout: config.store_timeout(),
    };
    Harness {
        service: Service::new(deps, &config),
        store,
        clock,
        events,
    }
}

pub fn harness() -> Harness {
    harness_with(TimeEngineConfig::default(), t0())
}
