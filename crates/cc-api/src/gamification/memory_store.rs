//! In-process progress store.
//!
//! Every transaction holds the store's single mutex for its whole lifetime and
//! works on a staged copy of the state, which replaces the shared state only
//! on commit. Dropping a transaction discards the copy.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use cc_db::{
    models::{Badge, EarnedBadge, QuizScore, UserProgress},
    seed::default_catalog,
};
use cc_gamify::{BadgeCriteria, RequirementType};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{ProgressStore, ProgressTx, StoreError};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    progress: HashMap<i64, UserProgress>,
    catalog: Vec<Badge>,
    grants: BTreeMap<(i64, i64), DateTime<Utc>>,
    completed_materials: HashMap<i64, BTreeSet<i64>>,
    // Insertion order doubles as the attempt id
    quiz_results: HashMap<i64, Vec<QuizScore>>,
}

impl MemoryState {
    fn earned_badges(&self, user_id: i64) -> Vec<EarnedBadge> {
        let mut earned: Vec<EarnedBadge> = self
            .grants
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .filter_map(|(&(_, badge_id), &earned_at)| {
                self.catalog
                    .iter()
                    .find(|badge| badge.id == badge_id)
                    .map(|badge| EarnedBadge {
                        id: badge.id,
                        name: badge.name.clone(),
                        description: badge.description.clone(),
                        icon: badge.icon.clone(),
                        earned_at,
                    })
            })
            .collect();

        earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.cmp(&a.id)));
        earned
    }

    fn quiz_results(&self, user_id: i64) -> &[QuizScore] {
        self.quiz_results
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryProgressStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProgressStore {
    /// Empty store carrying the standard badge catalog
    pub fn new() -> Self {
        Self::with_catalog(default_catalog())
    }

    pub fn with_catalog(catalog: Vec<Badge>) -> Self {
        let state = MemoryState {
            catalog,
            ..MemoryState::default()
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Insert or replace a user's progress record.
    pub async fn insert_user_progress(&self, progress: UserProgress) {
        self.inner
            .lock()
            .await
            .progress
            .insert(progress.user_id, progress);
    }

    pub async fn record_material_completion(&self, user_id: i64, material_id: i64) {
        self.inner
            .lock()
            .await
            .completed_materials
            .entry(user_id)
            .or_default()
            .insert(material_id);
    }

    pub async fn record_quiz_result(&self, user_id: i64, result: QuizScore) {
        self.inner
            .lock()
            .await
            .quiz_results
            .entry(user_id)
            .or_default()
            .push(result);
    }
}

pub struct MemoryProgressTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl std::fmt::Debug for MemoryProgressTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryProgressTx")
            .field("staged_users", &self.staged.progress.len())
            .field("staged_grants", &self.staged.grants.len())
            .finish_non_exhaustive()
    }
}

impl ProgressStore for MemoryProgressStore {
    type Tx = MemoryProgressTx;

    async fn begin(&self) -> Result<MemoryProgressTx, StoreError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryProgressTx { guard, staged })
    }

    async fn load_user_progress(&self, user_id: i64) -> Result<Option<UserProgress>, StoreError> {
        Ok(self.inner.lock().await.progress.get(&user_id).cloned())
    }

    async fn earned_badges(&self, user_id: i64) -> Result<Vec<EarnedBadge>, StoreError> {
        Ok(self.inner.lock().await.earned_badges(user_id))
    }

    async fn count_completed_materials(&self, user_id: i64) -> Result<i64, StoreError> {
        let state = self.inner.lock().await;
        let count = state
            .completed_materials
            .get(&user_id)
            .map_or(0, BTreeSet::len);
        Ok(count as i64)
    }

    async fn completed_material_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        let state = self.inner.lock().await;
        Ok(state
            .completed_materials
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn count_quiz_attempts(&self, user_id: i64) -> Result<i64, StoreError> {
        Ok(self.inner.lock().await.quiz_results(user_id).len() as i64)
    }

    async fn average_quiz_score(&self, user_id: i64) -> Result<f64, StoreError> {
        let state = self.inner.lock().await;
        let results = state.quiz_results(user_id);
        if results.is_empty() {
            return Ok(0.0);
        }
        let total: i64 = results.iter().map(|result| i64::from(result.score)).sum();
        Ok(total as f64 / results.len() as f64)
    }

    async fn best_quiz_score(&self, user_id: i64) -> Result<Option<i32>, StoreError> {
        let state = self.inner.lock().await;
        Ok(state
            .quiz_results(user_id)
            .iter()
            .map(|result| result.score)
            .max())
    }

    async fn recent_quiz_scores(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<QuizScore>, StoreError> {
        let state = self.inner.lock().await;
        // Newest insertion first, so the stable sort breaks timestamp ties the same way
        let mut results: Vec<QuizScore> = state
            .quiz_results(user_id)
            .iter()
            .rev()
            .cloned()
            .collect();
        results.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        results.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(results)
    }
}

impl ProgressTx for MemoryProgressTx {
    async fn lock_user_progress(
        &mut self,
        user_id: i64,
    ) -> Result<Option<UserProgress>, StoreError> {
        Ok(self.staged.progress.get(&user_id).cloned())
    }

    async fn save_user_progress(&mut self, record: &UserProgress) -> Result<(), StoreError> {
        if let Some(existing) = self.staged.progress.get_mut(&record.user_id) {
            *existing = record.clone();
        }
        Ok(())
    }

    async fn load_badge_catalog(
        &mut self,
        requirement_type: RequirementType,
        max_value: i64,
    ) -> Result<Vec<Badge>, StoreError> {
        let mut badges: Vec<Badge> = self
            .staged
            .catalog
            .iter()
            .filter(|badge| {
                badge.requirement_type == requirement_type
                    && badge.requirement_value() <= max_value
            })
            .cloned()
            .collect();
        badges.sort_by_key(|badge| (badge.requirement_value, badge.id));
        Ok(badges)
    }

    async fn has_grant(&mut self, user_id: i64, badge_id: i64) -> Result<bool, StoreError> {
        Ok(self.staged.grants.contains_key(&(user_id, badge_id)))
    }

    async fn create_grant(
        &mut self,
        user_id: i64,
        badge_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let key = (user_id, badge_id);
        if self.staged.grants.contains_key(&key) {
            return Ok(false);
        }
        self.staged.grants.insert(key, earned_at);
        Ok(true)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let Self { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
