use cc_db::{
    models::{Badge, EarnedBadge, QuizScore, UserProgress},
    repositories::{badge, learning, progress},
};
use cc_gamify::RequirementType;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use super::store::{ProgressStore, ProgressTx, StoreError};

/// PostgreSQL-backed progress store
#[derive(Clone, Debug)]
pub struct PgProgressStore {
    pool: PgPool,
}

impl PgProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// One engine operation's transaction; the progress row stays locked until it ends.
pub struct PgProgressTx {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgProgressTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgProgressTx").finish_non_exhaustive()
    }
}

impl ProgressStore for PgProgressStore {
    type Tx = PgProgressTx;

    async fn begin(&self) -> Result<PgProgressTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgProgressTx { tx })
    }

    async fn load_user_progress(&self, user_id: i64) -> Result<Option<UserProgress>, StoreError> {
        Ok(progress::find_user_progress(&self.pool, user_id).await?)
    }

    async fn earned_badges(&self, user_id: i64) -> Result<Vec<EarnedBadge>, StoreError> {
        Ok(badge::list_earned_badges(&self.pool, user_id).await?)
    }

    async fn count_completed_materials(&self, user_id: i64) -> Result<i64, StoreError> {
        Ok(learning::count_completed_materials(&self.pool, user_id).await?)
    }

    async fn completed_material_ids(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(learning::completed_material_ids(&self.pool, user_id).await?)
    }

    async fn count_quiz_attempts(&self, user_id: i64) -> Result<i64, StoreError> {
        Ok(learning::count_quiz_attempts(&self.pool, user_id).await?)
    }

    async fn average_quiz_score(&self, user_id: i64) -> Result<f64, StoreError> {
        Ok(learning::average_quiz_score(&self.pool, user_id).await?)
    }

    async fn best_quiz_score(&self, user_id: i64) -> Result<Option<i32>, StoreError> {
        Ok(learning::best_quiz_score(&self.pool, user_id).await?)
    }

    async fn recent_quiz_scores(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<QuizScore>, StoreError> {
        Ok(learning::recent_quiz_scores(&self.pool, user_id, limit).await?)
    }
}

impl ProgressTx for PgProgressTx {
    async fn lock_user_progress(
        &mut self,
        user_id: i64,
    ) -> Result<Option<UserProgress>, StoreError> {
        Ok(progress::lock_user_progress(&mut *self.tx, user_id).await?)
    }

    async fn save_user_progress(&mut self, record: &UserProgress) -> Result<(), StoreError> {
        let updated = progress::update_user_progress(&mut *self.tx, record).await?;
        if !updated {
            tracing::warn!(
                user_id = record.user_id,
                "Progress row vanished while locked"
            );
        }
        Ok(())
    }

    async fn load_badge_catalog(
        &mut self,
        requirement_type: RequirementType,
        max_value: i64,
    ) -> Result<Vec<Badge>, StoreError> {
        Ok(badge::find_badges_by_requirement(&mut *self.tx, requirement_type, max_value).await?)
    }

    async fn has_grant(&mut self, user_id: i64, badge_id: i64) -> Result<bool, StoreError> {
        Ok(badge::has_grant(&mut *self.tx, user_id, badge_id).await?)
    }

    async fn create_grant(
        &mut self,
        user_id: i64,
        badge_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(badge::insert_grant(&mut *self.tx, user_id, badge_id, earned_at).await?)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
