use cc_gamify::{BadgeCriteria, RequirementType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-user gamification record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Owning user (unique)
    pub user_id: i64,
    /// Experience points accumulated so far (never negative)
    #[serde(rename = "totalXP")]
    pub total_xp: i64,
    /// Level derived from `total_xp`
    pub level: i32,
    /// Consecutive calendar days with at least one login
    pub daily_streak: i32,
    /// Calendar day of the last counted login (server time zone)
    pub last_login_date: Option<NaiveDate>,
}

impl UserProgress {
    /// State of a freshly registered user
    pub const fn new(user_id: i64) -> Self {
        Self {
            user_id,
            total_xp: 0,
            level: 1,
            daily_streak: 0,
            last_login_date: None,
        }
    }
}

/// Badge catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Emoji shown by the client
    pub icon: String,
    #[sqlx(try_from = "String")]
    pub requirement_type: RequirementType,
    /// Threshold the user's value must reach
    pub requirement_value: i32,
}

impl BadgeCriteria for Badge {
    fn badge_id(&self) -> i64 {
        self.id
    }

    fn requirement_type(&self) -> RequirementType {
        self.requirement_type
    }

    fn requirement_value(&self) -> i64 {
        i64::from(self.requirement_value)
    }
}

/// A badge granted to a user, joined with its catalog data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Set when the grant is created, never updated
    pub earned_at: DateTime<Utc>,
}

/// A single quiz attempt as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizScore {
    pub quiz_id: i64,
    pub score: i32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Login credentials looked up by email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

/// Public user profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub business_name: Option<String>,
    pub role: String,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new email/password user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub business_name: Option<&'a str>,
}
