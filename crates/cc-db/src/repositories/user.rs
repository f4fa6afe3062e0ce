use sqlx::{Executor, Postgres};

use crate::models::{NewUser, UserCredentials, UserProfile};

pub async fn find_profile_by_id<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Option<UserProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, name, email, business_name, role, last_login_at
            FROM users
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_credentials_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<UserCredentials>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, email, password_hash
            FROM users
            WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(executor)
    .await
}

pub async fn email_exists<'e, E>(executor: E, email: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)
        "#,
    )
    .bind(email)
    .fetch_one(executor)
    .await
}

pub async fn create_user<'e, E>(executor: E, user: &NewUser<'_>) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            INSERT INTO users (name, email, password_hash, business_name, role)
            VALUES ($1, $2, $3, $4, 'user')
            RETURNING id
        "#,
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.business_name)
    .fetch_one(executor)
    .await
}

pub async fn touch_last_login<'e, E>(executor: E, user_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE users
            SET last_login_at = NOW(), updated_at = NOW()
            WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
