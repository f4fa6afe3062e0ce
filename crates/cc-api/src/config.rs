use serde::Deserialize;
use thiserror::Error;

/// Deployment environment
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration, read from environment variables.
///
/// Field names map to upper-case variables (`database_url` -> `DATABASE_URL`).
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub cookie_secret: String,
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,
    /// Comma-separated list of origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    /// Offset east of UTC, in minutes, of the zone in which streak days are counted
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
}

// Bounds enforced by bcrypt itself
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

const fn default_port() -> u16 {
    3000
}

const fn default_jwt_expiry_hours() -> i64 {
    24
}

fn default_allowed_origins() -> String {
    "http://localhost:8080".to_string()
}

const fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

const fn default_db_max_connections() -> u32 {
    10
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "JWT_SECRET must be at least 32 characters long".to_string(),
            ));
        }

        // PrivateCookieJar keys are derived from at least 64 bytes of material
        if self.cookie_secret.len() < 64 {
            return Err(ConfigError::Invalid(
                "COOKIE_SECRET must be at least 64 characters long".to_string(),
            ));
        }

        if self.jwt_expiry_hours <= 0 {
            return Err(ConfigError::Invalid(
                "JWT_EXPIRY_HOURS must be positive".to_string(),
            ));
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "BCRYPT_COST must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }

        if cc_gamify::SystemClock::from_offset_minutes(self.utc_offset_minutes).is_none() {
            return Err(ConfigError::Invalid(
                "UTC_OFFSET_MINUTES must be within ±24 hours".to_string(),
            ));
        }

        Ok(())
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}
