use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use axum_extra::extract::PrivateCookieJar;
use cc_db::{models::UserProfile, repositories::user};
use serde::{Deserialize, Serialize};

use super::{cookies, jwt, service};
use crate::{
    ApiState,
    error::{ApiError, ApiResponse},
    gamification::LoginSnapshot,
};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub business_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub business_name: Option<String>,
    pub role: String,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            business_name: profile.business_name,
            role: profile.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
    pub progress: LoginSnapshot,
}

async fn register(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<ApiResponse<AuthResponse>>), ApiError> {
    let Json(request) = payload?;
    let profile = service::register_user(
        &state.pool,
        service::Registration {
            name: &request.name,
            email: &request.email,
            password: &request.password,
            business_name: request.business_name.as_deref(),
        },
        state.bcrypt_cost,
    )
    .await?;

    let progress = state.engine.session_snapshot(profile.id).await?;
    let (jar, token) = issue_session(&state, jar, profile.id, &profile.email)?;

    Ok((
        jar,
        Json(ApiResponse::ok(
            "Registration successful",
            AuthResponse {
                token,
                user: profile.into(),
                progress,
            },
        )),
    ))
}

async fn login(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<ApiResponse<AuthResponse>>), ApiError> {
    let Json(request) = payload?;
    let credentials = service::authenticate(&state.pool, &request.email, &request.password).await?;

    let progress = state.engine.on_login(credentials.id).await?;

    let profile = user::find_profile_by_id(&state.pool, credentials.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let (jar, token) = issue_session(&state, jar, profile.id, &profile.email)?;

    Ok((
        jar,
        Json(ApiResponse::ok(
            "Login successful",
            AuthResponse {
                token,
                user: profile.into(),
                progress,
            },
        )),
    ))
}

async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<ApiResponse<()>>) {
    let jar = jar.remove(cookies::removal_cookie());
    (jar, Json(ApiResponse::success("Logged out")))
}

fn issue_session(
    state: &ApiState,
    jar: PrivateCookieJar,
    user_id: i64,
    email: &str,
) -> Result<(PrivateCookieJar, String), ApiError> {
    let token = jwt::generate_jwt_token(
        user_id,
        email.to_string(),
        &state.auth.jwt_secret,
        state.auth.jwt_expiry_hours,
    )?;

    let cookie = cookies::create_auth_cookie(
        token.clone(),
        &state.auth.environment,
        state.auth.jwt_expiry_hours,
    );

    Ok((jar.add(cookie), token))
}
