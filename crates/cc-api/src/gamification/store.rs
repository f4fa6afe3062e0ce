//! Persistence seam of the gamification engine.
//!
//! The engine talks to storage only through [`ProgressStore`] (reads outside a
//! transaction) and [`ProgressTx`] (the locked read-modify-write cycle of one
//! operation). A transaction that is dropped without [`ProgressTx::commit`]
//! rolls back.

use std::future::Future;

use cc_db::models::{Badge, EarnedBadge, QuizScore, UserProgress};
use cc_gamify::RequirementType;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// SQLSTATE codes of failures that succeed when the transaction is replayed
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("write conflict with a concurrent transaction")]
    Conflict,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let retryable = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&&*code));

        if retryable {
            Self::Conflict
        } else {
            Self::Database(err)
        }
    }
}

pub trait ProgressStore: Clone + Send + Sync + 'static {
    type Tx: ProgressTx;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    fn load_user_progress(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<UserProgress>, StoreError>> + Send;

    /// Granted badges, most recently earned first
    fn earned_badges(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<EarnedBadge>, StoreError>> + Send;

    fn count_completed_materials(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn completed_material_ids(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<i64>, StoreError>> + Send;

    fn count_quiz_attempts(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Mean score over all attempts, 0 without attempts
    fn average_quiz_score(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<f64, StoreError>> + Send;

    fn best_quiz_score(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<i32>, StoreError>> + Send;

    /// Latest attempts first
    fn recent_quiz_scores(
        &self,
        user_id: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<QuizScore>, StoreError>> + Send;
}

pub trait ProgressTx: Send {
    /// Load a record and hold it exclusively until commit or rollback.
    fn lock_user_progress(
        &mut self,
        user_id: i64,
    ) -> impl Future<Output = Result<Option<UserProgress>, StoreError>> + Send;

    fn save_user_progress(
        &mut self,
        progress: &UserProgress,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Catalog entries of one type whose threshold is at most `max_value`
    fn load_badge_catalog(
        &mut self,
        requirement_type: RequirementType,
        max_value: i64,
    ) -> impl Future<Output = Result<Vec<Badge>, StoreError>> + Send;

    fn has_grant(
        &mut self,
        user_id: i64,
        badge_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `false` when the grant already existed; the existing grant is left untouched.
    fn create_grant(
        &mut self,
        user_id: i64,
        badge_id: i64,
        earned_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
