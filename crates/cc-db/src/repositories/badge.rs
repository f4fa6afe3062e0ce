use cc_gamify::RequirementType;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::models::{Badge, EarnedBadge};

/// Catalog entries of one requirement type with a threshold at most `max_value`,
/// lowest threshold first.
pub async fn find_badges_by_requirement<'e, E>(
    executor: E,
    requirement_type: RequirementType,
    max_value: i64,
) -> Result<Vec<Badge>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, name, description, icon, requirement_type, requirement_value
            FROM badges
            WHERE requirement_type = $1 AND requirement_value <= $2
            ORDER BY requirement_value, id
        "#,
    )
    .bind(requirement_type.as_str())
    .bind(max_value)
    .fetch_all(executor)
    .await
}

/// Insert a catalog entry, or refresh its display fields if the name exists.
pub async fn upsert_badge<'e, E>(
    executor: E,
    name: &str,
    description: &str,
    icon: &str,
    requirement_type: RequirementType,
    requirement_value: i32,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO badges (name, description, icon, requirement_type, requirement_value)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name)
            DO UPDATE SET
                description = EXCLUDED.description,
                icon = EXCLUDED.icon
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(icon)
    .bind(requirement_type.as_str())
    .bind(requirement_value)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn has_grant<'e, E>(executor: E, user_id: i64, badge_id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT EXISTS(
                SELECT 1 FROM user_badges
                WHERE user_id = $1 AND badge_id = $2
            )
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .fetch_one(executor)
    .await
}

/// Record that a user earned a badge.
///
/// Returns `false` without touching the existing row when the grant already
/// exists; `ON CONFLICT` keeps the surrounding transaction usable.
pub async fn insert_grant<'e, E>(
    executor: E,
    user_id: i64,
    badge_id: i64,
    earned_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_badges (user_id, badge_id, earned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, badge_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .bind(earned_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Badges earned by a user, most recent first.
pub async fn list_earned_badges<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Vec<EarnedBadge>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT b.id, b.name, b.description, b.icon, ub.earned_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_id = $1
            ORDER BY ub.earned_at DESC, b.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
