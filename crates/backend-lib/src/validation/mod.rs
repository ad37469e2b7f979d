// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Form input validation.

use crate::auth::{validate_password_strength, PasswordRequirements};
use crate::error::AppError;
use regex::Regex;
use secrets_common::Credentials;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_USERNAME_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_SECRET_LENGTH: usize = 1000;

// Login keys are emails or plain usernames; anything printable without spaces
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("username pattern compiles"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Validate a login key
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username must not be empty".to_string(),
        ));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Username must not contain whitespace or control characters".to_string(),
        ));
    }

    Ok(username)
}

/// Validate a password against the configured length policy
pub fn validate_password<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    if !validate_password_strength(password, requirements) {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be between {} and {} characters",
            requirements.min_length, requirements.max_length
        )));
    }

    Ok(password)
}

/// Validate a secret payload. Returns it trimmed.
pub fn validate_secret(secret: &str) -> ValidationResult<&str> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidSecret(
            "Secret must not be empty".to_string(),
        ));
    }

    if trimmed.chars().count() > MAX_SECRET_LENGTH {
        return Err(ValidationError::InvalidSecret(format!(
            "Secret cannot exceed {MAX_SECRET_LENGTH} characters"
        )));
    }

    Ok(trimmed)
}

/// Validate a registration form
pub fn validate_registration(
    credentials: &Credentials,
    requirements: &PasswordRequirements,
) -> ValidationResult<()> {
    validate_username(&credentials.username)?;
    validate_password(&credentials.password, requirements)?;
    Ok(())
}
