use sqlx::{Executor, Postgres};

use crate::models::UserProgress;

/// Create the gamification record of a newly registered user.
pub async fn create_user_progress<'e, E>(executor: E, user_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_progress (user_id, total_xp, level, daily_streak)
            VALUES ($1, 0, 1, 0)
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_user_progress<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, total_xp, level, daily_streak, last_login_date
            FROM user_progress
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Load a user's record and hold a row lock on it until the surrounding
/// transaction ends, so concurrent read-modify-write cycles serialize.
pub async fn lock_user_progress<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, total_xp, level, daily_streak, last_login_date
            FROM user_progress
            WHERE user_id = $1
            FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn update_user_progress<'e, E>(
    executor: E,
    progress: &UserProgress,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE user_progress
            SET total_xp = $2,
                level = $3,
                daily_streak = $4,
                last_login_date = $5,
                updated_at = NOW()
            WHERE user_id = $1
        "#,
    )
    .bind(progress.user_id)
    .bind(progress.total_xp)
    .bind(progress.level)
    .bind(progress.daily_streak)
    .bind(progress.last_login_date)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
