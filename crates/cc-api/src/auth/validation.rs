use validator::ValidateEmail;

use crate::error::ApiError;

/// Validate email format using the validator crate
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::Validation("Email cannot be empty".to_string()));
    }

    if !email.validate_email() {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }

    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    // bcrypt ignores everything past 72 bytes
    if password.len() > 72 {
        return Err(ApiError::Validation(
            "Password must be at most 72 characters long".to_string(),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_number = password.chars().any(|c| c.is_numeric());

    if !has_letter || !has_number {
        return Err(ApiError::Validation(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }

    Ok(())
}

/// Validate a display name
pub fn validate_name(name: &str) -> Result<(), ApiError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ApiError::Validation("Name cannot be empty".to_string()));
    }

    if trimmed.chars().count() > 100 {
        return Err(ApiError::Validation(
            "Name must be at most 100 characters long".to_string(),
        ));
    }

    if trimmed.chars().any(|c| c.is_control() || c == '<' || c == '>') {
        return Err(ApiError::Validation("Name contains invalid characters".to_string()));
    }

    Ok(())
}
