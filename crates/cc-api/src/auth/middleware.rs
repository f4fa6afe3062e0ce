use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use super::{cookies::AUTH_COOKIE, jwt::verify_jwt_token};
use crate::{error::ApiError, state::AuthConfig};

/// Authenticated user extractor
///
/// Use this in route handlers to ensure the user is authenticated. The JWT
/// is read from the private `auth_token` cookie, or from an
/// `Authorization: Bearer` header for clients that do not keep cookies.
///
/// # Example
/// ```
/// use cc_api::{auth::AuthUser, error::ApiError};
///
/// async fn protected_route(auth_user: AuthUser) -> Result<String, ApiError> {
///     Ok(format!("hello user {}", auth_user.user_id))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_config = AuthConfig::from_ref(state);

        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth("Failed to read cookies".to_string()))?;

        let token = match jar.get(AUTH_COOKIE) {
            Some(cookie) => cookie.value().to_owned(),
            None => bearer_token(parts)
                .ok_or_else(|| ApiError::Auth("Not authenticated".to_string()))?,
        };

        let claims = verify_jwt_token(&token, &auth_config.jwt_secret)?;

        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| ApiError::Auth("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}
