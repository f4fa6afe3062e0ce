use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use cc_gamify::SystemClock;
use sqlx::PgPool;

use crate::{
    ApiConfig,
    config::{ConfigError, Environment},
    gamification::{GamificationEngine, PgProgressStore},
};

/// Settings the auth extractor needs
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: Environment,
}

#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub engine: GamificationEngine<PgProgressStore>,
    pub auth: AuthConfig,
    pub cookie_key: Key,
    pub bcrypt_cost: u32,
}

impl ApiState {
    pub fn new(config: &ApiConfig, pool: PgPool) -> Result<Self, ConfigError> {
        let cookie_key = Key::try_from(config.cookie_secret.as_bytes())
            .map_err(|_| ConfigError::Invalid("COOKIE_SECRET is too short".to_string()))?;

        let clock = SystemClock::from_offset_minutes(config.utc_offset_minutes)
            .ok_or_else(|| ConfigError::Invalid("UTC_OFFSET_MINUTES is out of range".to_string()))?;

        let engine = GamificationEngine::with_clock(PgProgressStore::new(pool.clone()), clock);

        Ok(Self {
            pool,
            engine,
            auth: AuthConfig {
                jwt_secret: config.jwt_secret.clone(),
                jwt_expiry_hours: config.jwt_expiry_hours,
                environment: config.env.clone(),
            },
            cookie_key,
            bcrypt_cost: config.bcrypt_cost,
        })
    }
}

impl FromRef<ApiState> for Key {
    fn from_ref(state: &ApiState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<ApiState> for AuthConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<ApiState> for GamificationEngine<PgProgressStore> {
    fn from_ref(state: &ApiState) -> Self {
        state.engine.clone()
    }
}
