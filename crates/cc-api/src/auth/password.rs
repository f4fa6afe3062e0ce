//! bcrypt hashing, run on the blocking pool so it never stalls the runtime.

use crate::error::ApiError;

pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Password verification task failed: {e}")))?;

    Ok(verified.unwrap_or_else(|e| {
        tracing::warn!("Stored password hash could not be parsed: {e}");
        false
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("password123".to_string(), 4).await.unwrap();
        assert_ne!(hash, "password123");

        let matches = verify_password("password123".to_string(), hash.clone()).await;
        assert!(matches.unwrap());

        let matches = verify_password("password124".to_string(), hash).await;
        assert!(!matches.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let first = hash_password("password123".to_string(), 4).await.unwrap();
        let second = hash_password("password123".to_string(), 4).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_verify() {
        let matches = verify_password("password123".to_string(), "not-a-hash".to_string()).await;
        assert!(!matches.unwrap());
    }
}
