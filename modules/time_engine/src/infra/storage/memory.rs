//! Process-local store used by `--mock` runs and tests.
//!
//! Profiles live in a `DashMap`, so each delta is applied under the shard
//! lock of its row. Mission completion takes the completions lock first and
//! the profile shard second, which makes check-insert-credit one step.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::contract::model::{
    CompletedMission, Mission, MissionCompletion, Profile, QuestionOfTheDay, QuestionResponse,
};
use crate::domain::ports::StreakRoutine;
use crate::domain::repo::{
    CompletionOutcome, DecayCandidate, DecayUpdate, MissionRepository, ProfileDelta,
    ProfileRepository, QuestionRepository,
};
use crate::domain::reward::level_for_xp;

#[derive(Default)]
pub struct InMemoryStore {
    profiles: DashMap<Uuid, Profile>,
    missions: DashMap<Uuid, Mission>,
    completions: Mutex<Vec<MissionCompletion>>,
    questions: DashMap<Uuid, QuestionOfTheDay>,
    responses: Mutex<Vec<QuestionResponse>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite or add a profile as-is.
    pub fn put_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn put_mission(&self, mission: Mission) {
        self.missions.insert(mission.id, mission);
    }

    pub fn response_count(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().len()
    }
}

fn apply_delta_in_place(p: &mut Profile, delta: ProfileDelta, now: DateTime<Utc>) {
    p.xp_points = (p.xp_points + delta.xp).max(0);
    p.level = level_for_xp(p.xp_points);
    p.time_balance = (p.time_balance + delta.hours).max(0);
    p.last_active = Some(now);
    p.updated_at = now;
}

fn decay_in_place(p: &mut Profile, update: &DecayUpdate) -> bool {
    if p.last_active != update.observed_last_active {
        return false;
    }
    p.time_balance = (p.time_balance - update.hours).max(0);
    p.last_active = Some(update.new_last_active);
    p.updated_at = update.new_last_active;
    true
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn find_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn insert_profile(&self, profile: Profile) -> anyhow::Result<bool> {
        match self.profiles.entry(profile.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(profile);
                Ok(true)
            }
        }
    }

    async fn list_profiles(
        &self,
        active_since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<Profile>> {
        let mut rows: Vec<Profile> = self
            .profiles
            .iter()
            .filter(|p| match active_since {
                Some(since) => p.last_active.is_some_and(|at| at >= since),
                None => true,
            })
            .map(|p| p.clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn list_decay_candidates(&self) -> anyhow::Result<Vec<DecayCandidate>> {
        let mut rows: Vec<DecayCandidate> = self
            .profiles
            .iter()
            .filter(|p| p.last_active.is_some())
            .map(|p| DecayCandidate {
                id: p.id,
                time_balance: p.time_balance,
                last_active: p.last_active,
            })
            .collect();
        rows.sort_by_key(|c| c.id);
        Ok(rows)
    }

    async fn apply_decay_batch(&self, batch: &[DecayUpdate]) -> anyhow::Result<usize> {
        let mut applied = 0;
        for update in batch {
            if let Some(mut p) = self.profiles.get_mut(&update.id) {
                if decay_in_place(&mut p, update) {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }

    async fn apply_decay(&self, update: &DecayUpdate) -> anyhow::Result<Option<Profile>> {
        let Some(mut p) = self.profiles.get_mut(&update.id) else {
            return Ok(None);
        };
        Ok(decay_in_place(&mut p, update).then(|| p.clone()))
    }

    async fn apply_delta(
        &self,
        id: Uuid,
        delta: ProfileDelta,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Profile>> {
        Ok(self.profiles.get_mut(&id).map(|mut p| {
            apply_delta_in_place(&mut p, delta, now);
            p.clone()
        }))
    }

    async fn count_with_more_xp(&self, xp: i64) -> anyhow::Result<u64> {
        Ok(self.profiles.iter().filter(|p| p.xp_points > xp).count() as u64)
    }
}

#[async_trait]
impl MissionRepository for InMemoryStore {
    async fn find_mission(&self, id: Uuid) -> anyhow::Result<Option<Mission>> {
        Ok(self.missions.get(&id).map(|m| m.clone()))
    }

    async fn list_active_missions(&self) -> anyhow::Result<Vec<Mission>> {
        let mut rows: Vec<Mission> = self
            .missions
            .iter()
            .filter(|m| m.is_active)
            .map(|m| m.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_mission(&self, mission: Mission) -> anyhow::Result<()> {
        self.missions.insert(mission.id, mission);
        Ok(())
    }

    async fn has_completed(&self, user_id: Uuid, mission_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .completions
            .lock()
            .iter()
            .any(|c| c.user_id == user_id && c.mission_id == mission_id))
    }

    async fn complete_mission(
        &self,
        completion: MissionCompletion,
        delta: ProfileDelta,
    ) -> anyhow::Result<CompletionOutcome> {
        let mut completions = self.completions.lock();
        if completions
            .iter()
            .any(|c| c.user_id == completion.user_id && c.mission_id == completion.mission_id)
        {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }
        let Some(mut profile) = self.profiles.get_mut(&completion.user_id) else {
            return Ok(CompletionOutcome::ProfileMissing);
        };
        apply_delta_in_place(&mut profile, delta, completion.completed_at);
        let updated = profile.clone();
        drop(profile);
        completions.push(completion);
        Ok(CompletionOutcome::Completed(updated))
    }

    async fn list_completions(&self, user_id: Uuid) -> anyhow::Result<Vec<CompletedMission>> {
        let mut rows: Vec<CompletedMission> = self
            .completions
            .lock()
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| CompletedMission {
                completion: c.clone(),
                mission: self.missions.get(&c.mission_id).map(|m| m.clone()),
            })
            .collect();
        rows.sort_by(|a, b| b.completion.completed_at.cmp(&a.completion.completed_at));
        Ok(rows)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn find_question(&self, id: Uuid) -> anyhow::Result<Option<QuestionOfTheDay>> {
        Ok(self.questions.get(&id).map(|q| q.clone()))
    }

    async fn find_question_for_date(
        &self,
        date: NaiveDate,
    ) -> anyhow::Result<Option<QuestionOfTheDay>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.active_date == date)
            .max_by_key(|q| q.created_at)
            .map(|q| q.clone()))
    }

    async fn insert_question(&self, question: QuestionOfTheDay) -> anyhow::Result<()> {
        self.questions.insert(question.id, question);
        Ok(())
    }

    async fn insert_response(&self, response: QuestionResponse) -> anyhow::Result<()> {
        self.responses.lock().push(response);
        Ok(())
    }

    async fn has_responded(&self, user_id: Uuid, question_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .responses
            .lock()
            .iter()
            .any(|r| r.user_id == user_id && r.question_id == question_id))
    }
}

#[async_trait]
impl StreakRoutine for InMemoryStore {
    async fn update_streaks(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let cutoff = now - Duration::hours(24);
        let mut active: HashSet<Uuid> = self
            .completions
            .lock()
            .iter()
            .filter(|c| c.completed_at >= cutoff)
            .map(|c| c.user_id)
            .collect();
        active.extend(
            self.responses
                .lock()
                .iter()
                .filter(|r| r.created_at >= cutoff)
                .map(|r| r.user_id),
        );

        let mut touched = 0;
        for mut p in self.profiles.iter_mut() {
            if active.contains(&p.id) {
                p.streak_days += 1;
                touched += 1;
            } else if p.streak_days != 0 {
                p.streak_days = 0;
                touched += 1;
            }
        }
        Ok(touched)
    }
}
