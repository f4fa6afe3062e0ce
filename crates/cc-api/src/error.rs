use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::gamification::GamificationError;

/// JSON envelope shared by every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Successful response without a payload
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Gamification(#[from] GamificationError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth(_) | Self::Jwt(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Gamification(err) => match err {
                GamificationError::InvalidPoints(_) => StatusCode::BAD_REQUEST,
                GamificationError::ProgressNotFound(_) => StatusCode::NOT_FOUND,
                GamificationError::Conflict(_) => StatusCode::CONFLICT,
                GamificationError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message safe to show to the client
    fn public_message(&self) -> String {
        match self {
            Self::Auth(msg) | Self::Validation(msg) | Self::NotFound(msg) | Self::Conflict(msg) => {
                msg.clone()
            }
            Self::Jwt(_) => "Invalid or expired token".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Gamification(GamificationError::Store(_)) => "Internal server error".to_string(),
            Self::Gamification(err) => err.to_string(),
        }
    }
}

/// Malformed or mistyped JSON bodies are client errors, reported in the usual envelope
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        Self::Validation("Invalid request data".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(ApiResponse::failure(self.public_message()))).into_response()
    }
}
