use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id as string
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Generate a JWT token for a user
pub fn generate_jwt_token(
    user_id: i64,
    email: String,
    jwt_secret: &str,
    expiry_hours: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email,
        iat: now.timestamp() as usize,
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Auth("Invalid or expired token".to_string()))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_jwt_secret_minimum_32_characters_long";

    #[test]
    fn test_generate_and_verify_jwt_token() {
        let token = generate_jwt_token(42, "test@example.com".to_string(), SECRET, 24)
            .expect("Failed to generate token");

        assert!(!token.is_empty(), "Token should not be empty");

        let claims = verify_jwt_token(&token, SECRET).expect("Failed to verify token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "test@example.com");
        assert!(
            claims.exp > claims.iat,
            "Expiration should be after issued at"
        );
    }

    #[test]
    fn test_verify_jwt_token_with_wrong_secret() {
        let token = generate_jwt_token(42, "test@example.com".to_string(), SECRET, 24)
            .expect("Failed to generate token");

        let result = verify_jwt_token(&token, "wrong_jwt_secret_minimum_32_characters_long");

        match result {
            Err(ApiError::Auth(msg)) => {
                assert!(msg.contains("Invalid or expired token"));
            }
            _ => panic!("Expected Auth error"),
        }
    }

    #[test]
    fn test_verify_invalid_jwt_token() {
        let result = verify_jwt_token("invalid.jwt.token", SECRET);

        assert!(
            matches!(result, Err(ApiError::Auth(_))),
            "Verification should fail for invalid token"
        );
    }

    #[test]
    fn test_expired_jwt_token_is_rejected() {
        // Well past the default 60s leeway
        let token = generate_jwt_token(42, "test@example.com".to_string(), SECRET, -2)
            .expect("Failed to generate token");

        assert!(verify_jwt_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_jwt_token_expiration() {
        let token = generate_jwt_token(42, "test@example.com".to_string(), SECRET, 24)
            .expect("Failed to generate token");

        let claims = verify_jwt_token(&token, SECRET).expect("Failed to verify token");

        let expiration_duration = claims.exp - claims.iat;
        assert!(
            (86390..=86410).contains(&expiration_duration),
            "Token should expire in approximately 24 hours, got {} seconds",
            expiration_duration
        );
    }
}
