use cc_db::models::{Badge, EarnedBadge, QuizScore};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Progress shown right after login and when an existing session is resumed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSnapshot {
    pub xp: i64,
    pub level: i32,
    pub daily_streak: i32,
    /// Whether this login extended (or started) the streak
    pub streak_continued: bool,
    pub badges: Vec<EarnedBadge>,
    pub completed_materials: Vec<i64>,
    /// Most recent quiz attempts, newest first
    pub quiz_scores: Vec<QuizScore>,
    pub last_active_date: Option<NaiveDate>,
    /// Badges granted by this login
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
    pub points_awarded: i64,
    #[serde(rename = "newXP")]
    pub new_xp: i64,
    pub new_level: i32,
    pub leveled_up: bool,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub old_streak: i32,
    pub new_streak: i32,
    pub streak_continued: bool,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
    pub badge_count: usize,
    pub completed_materials: i64,
    pub quiz_attempts: i64,
    /// Rounded to two decimals, 0 without attempts
    pub avg_quiz_score: f64,
    pub badges: Vec<EarnedBadge>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSyncOutcome {
    pub completed_materials: i64,
    pub quiz_attempts: i64,
    pub best_quiz_score: Option<i32>,
    pub new_badges: Vec<Badge>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AwardPointsRequest {
    #[validate(range(min = 1, message = "Points must be a positive number"))]
    pub points: i64,
    /// Free-form label kept only in logs
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}
