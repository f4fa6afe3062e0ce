use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use cc_gamify::Clock;
use serde::Serialize;
use validator::Validate;

use super::{
    engine::{GamificationEngine, GamificationError},
    model::{
        AwardOutcome, AwardPointsRequest, BadgeSyncOutcome, LoginSnapshot, ProgressSummary,
        StreakUpdate,
    },
    store::ProgressStore,
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResponse},
    state::AuthConfig,
};

/// Gamification endpoints, usable with any state that can hand out an engine.
pub fn routes<St, S, C>() -> Router<St>
where
    St: Clone + Send + Sync + 'static,
    S: ProgressStore,
    C: Clock + Clone + 'static,
    GamificationEngine<S, C>: FromRef<St>,
    AuthConfig: FromRef<St>,
    Key: FromRef<St>,
{
    Router::new()
        .route("/api/check_session", get(check_session::<S, C>))
        .route("/api/award_points", post(award_points::<S, C>))
        .route("/api/update_streak", post(update_streak::<S, C>))
        .route("/api/get_progress", get(get_progress::<S, C>))
        .route("/api/sync_badges", post(sync_badges::<S, C>))
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<LoginSnapshot>,
}

impl SessionStatus {
    fn logged_out() -> Self {
        Self {
            is_logged_in: false,
            user: None,
            progress: None,
        }
    }
}

async fn check_session<S, C>(
    auth_user: Result<AuthUser, ApiError>,
    State(engine): State<GamificationEngine<S, C>>,
) -> Result<Json<ApiResponse<SessionStatus>>, ApiError>
where
    S: ProgressStore,
    C: Clock,
{
    let Ok(auth_user) = auth_user else {
        return Ok(Json(ApiResponse::ok(
            "Not logged in",
            SessionStatus::logged_out(),
        )));
    };

    let progress = match engine.session_snapshot(auth_user.user_id).await {
        Ok(progress) => progress,
        // Token outlived its user
        Err(GamificationError::ProgressNotFound(_)) => {
            return Ok(Json(ApiResponse::ok(
                "Not logged in",
                SessionStatus::logged_out(),
            )));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ApiResponse::ok(
        "Session active",
        SessionStatus {
            is_logged_in: true,
            user: Some(SessionUser {
                id: auth_user.user_id,
                email: auth_user.email,
            }),
            progress: Some(progress),
        },
    )))
}

async fn award_points<S, C>(
    auth_user: AuthUser,
    State(engine): State<GamificationEngine<S, C>>,
    payload: Result<Json<AwardPointsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AwardOutcome>>, ApiError>
where
    S: ProgressStore,
    C: Clock,
{
    let Json(request) = payload?;
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    if let Some(reason) = request.reason.as_deref() {
        tracing::debug!(user_id = auth_user.user_id, reason, "Awarding points");
    }

    let outcome = engine
        .award_points(auth_user.user_id, request.points)
        .await?;

    let message = if outcome.leveled_up {
        format!("Level up! You reached level {}", outcome.new_level)
    } else {
        format!("Awarded {} points", outcome.points_awarded)
    };

    Ok(Json(ApiResponse::ok(message, outcome)))
}

async fn update_streak<S, C>(
    auth_user: AuthUser,
    State(engine): State<GamificationEngine<S, C>>,
) -> Result<Json<ApiResponse<StreakUpdate>>, ApiError>
where
    S: ProgressStore,
    C: Clock,
{
    let update = engine.update_streak(auth_user.user_id).await?;
    Ok(Json(ApiResponse::ok("Streak updated", update)))
}

async fn get_progress<S, C>(
    auth_user: AuthUser,
    State(engine): State<GamificationEngine<S, C>>,
) -> Result<Json<ApiResponse<ProgressSummary>>, ApiError>
where
    S: ProgressStore,
    C: Clock,
{
    let summary = engine.get_progress(auth_user.user_id).await?;
    Ok(Json(ApiResponse::ok("Progress retrieved", summary)))
}

async fn sync_badges<S, C>(
    auth_user: AuthUser,
    State(engine): State<GamificationEngine<S, C>>,
) -> Result<Json<ApiResponse<BadgeSyncOutcome>>, ApiError>
where
    S: ProgressStore,
    C: Clock,
{
    let outcome = engine.sync_learning_badges(auth_user.user_id).await?;
    let message = match outcome.new_badges.len() {
        0 => "No new badges".to_string(),
        1 => "Earned 1 new badge".to_string(),
        n => format!("Earned {n} new badges"),
    };
    Ok(Json(ApiResponse::ok(message, outcome)))
}
