use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use cc_gamify::SystemClock;

use crate::{
    auth,
    error::ApiResponse,
    gamification::{self, PgProgressStore},
    state::ApiState,
};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(gamification::routes::<ApiState, PgProgressStore, SystemClock>())
        .fallback(handler_404)
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("The requested resource was not found")),
    )
}
