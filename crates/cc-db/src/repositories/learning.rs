//! Read-only aggregates over learning records.
//!
//! Materials and quiz results belong to the content subsystem; gamification
//! only ever reads them.

use sqlx::{Executor, Postgres};

use crate::models::QuizScore;

pub async fn count_completed_materials<'e, E>(executor: E, user_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM user_materials
            WHERE user_id = $1 AND status = 'completed'
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn completed_material_ids<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT material_id
            FROM user_materials
            WHERE user_id = $1 AND status = 'completed'
            ORDER BY material_id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn count_quiz_attempts<'e, E>(executor: E, user_id: i64) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM quiz_results
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Mean of all quiz scores, 0 when the user has no attempts.
pub async fn average_quiz_score<'e, E>(executor: E, user_id: i64) -> Result<f64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COALESCE(AVG(score)::float8, 0.0)
            FROM quiz_results
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn best_quiz_score<'e, E>(executor: E, user_id: i64) -> Result<Option<i32>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT MAX(score)
            FROM quiz_results
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn recent_quiz_scores<'e, E>(
    executor: E,
    user_id: i64,
    limit: i64,
) -> Result<Vec<QuizScore>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT quiz_id, score, passed, completed_at
            FROM quiz_results
            WHERE user_id = $1
            ORDER BY completed_at DESC, id DESC
            LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}
