use cc_db::{
    models::{NewUser, UserCredentials, UserProfile},
    repositories::{progress, user},
};
use sqlx::PgPool;

use super::{password, validation};
use crate::{error::ApiError, metrics};

const EMAIL_TAKEN: &str = "Email is already registered";
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration input, as received from the client
#[derive(Debug)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub business_name: Option<&'a str>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a user together with an empty progress record.
///
/// Both rows are written in one transaction, so a registered user always has
/// progress for the engine to work on.
pub async fn register_user(
    pool: &PgPool,
    registration: Registration<'_>,
    bcrypt_cost: u32,
) -> Result<UserProfile, ApiError> {
    let email = normalize_email(registration.email);
    let name = registration.name.trim();
    let business_name = registration
        .business_name
        .map(str::trim)
        .filter(|business| !business.is_empty());

    validation::validate_name(name)?;
    validation::validate_email(&email)?;
    validation::validate_password(registration.password)?;

    if user::email_exists(pool, &email).await? {
        return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let password_hash =
        password::hash_password(registration.password.to_string(), bcrypt_cost).await?;

    let mut tx = pool.begin().await?;

    let new_user = NewUser {
        name,
        email: &email,
        password_hash: &password_hash,
        business_name,
    };
    // A concurrent registration can still win the race past `email_exists`
    let user_id = match user::create_user(&mut *tx, &new_user).await {
        Ok(id) => id,
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some("users_email_key") => {
            return Err(ApiError::Conflict(EMAIL_TAKEN.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    progress::create_user_progress(&mut *tx, user_id).await?;

    let profile = user::find_profile_by_id(&mut *tx, user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Registered user vanished".to_string()))?;

    tx.commit().await?;

    tracing::info!(user_id, "User registered");
    metrics::record_auth_event("register", "password", true);

    Ok(profile)
}

/// Check an email/password pair and stamp the login time.
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password_attempt: &str,
) -> Result<UserCredentials, ApiError> {
    let email = normalize_email(email);

    let Some(credentials) = user::find_credentials_by_email(pool, &email).await? else {
        metrics::record_auth_event("login", "password", false);
        return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
    };

    let verified = password::verify_password(
        password_attempt.to_string(),
        credentials.password_hash.clone(),
    )
    .await?;

    if !verified {
        tracing::debug!(user_id = credentials.id, "Password mismatch");
        metrics::record_auth_event("login", "password", false);
        return Err(ApiError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    user::touch_last_login(pool, credentials.id).await?;
    metrics::record_auth_event("login", "password", true);

    Ok(credentials)
}
