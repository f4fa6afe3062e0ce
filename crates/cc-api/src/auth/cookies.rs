use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Environment;

pub const AUTH_COOKIE: &str = "auth_token";

/// Create an auth cookie with the JWT token
///
/// Cookies are secure (HTTPS-only) by default in production.
/// In development mode, cookies can be used over HTTP.
pub fn create_auth_cookie(
    token: String,
    environment: &Environment,
    expiry_hours: i64,
) -> Cookie<'static> {
    let is_development = environment.is_development();

    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .max_age(time::Duration::hours(expiry_hours))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!is_development)
        .build()
}

/// Cookie that, once removed from the jar, clears the auth cookie in the browser
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE).path("/").build()
}
