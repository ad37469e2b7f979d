// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use crate::config::PasswordSettings;
use crate::error::AppError;
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use std::sync::Arc;
use zeroize::Zeroize;

/// Password length requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        let settings = PasswordSettings::default();
        Self::from(&settings)
    }
}

impl From<&PasswordSettings> for PasswordRequirements {
    fn from(settings: &PasswordSettings) -> Self {
        Self {
            min_length: settings.min_length,
            max_length: settings.max_length,
        }
    }
}

/// Hash a password using scrypt with the given work factor
pub fn hash_password(plain: &str, params: Params) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)
        .map_err(|e| AppError::HashingFailed(e.to_string()))?
        .to_string();
    if hash.is_empty() {
        return Err(AppError::HashingFailed("empty hash produced".to_string()));
    }
    Ok(hash)
}

/// Verify a password against a hash. Malformed hashes never verify.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Check a password against the length policy (counted in characters)
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    let len = password.chars().count();
    len >= requirements.min_length && len <= requirements.max_length
}

/// Password hashing service that keeps scrypt off the async workers
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    requirements: PasswordRequirements,
    /// Hash checked when the login key is unknown, so that path costs the
    /// same as a wrong password
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(settings: &PasswordSettings) -> Result<Self, AppError> {
        let params = settings
            .scrypt_params()
            .map_err(|e| AppError::HashingFailed(e.to_string()))?;
        let dummy_hash = hash_password("not-a-real-password", params)?;
        Ok(Self {
            params,
            requirements: PasswordRequirements::from(settings),
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    pub fn requirements(&self) -> &PasswordRequirements {
        &self.requirements
    }

    /// Hash on the blocking pool
    pub async fn hash(&self, plain: &str) -> Result<String, AppError> {
        let params = self.params;
        let mut owned = plain.to_string();
        tokio::task::spawn_blocking(move || {
            let result = hash_password(&owned, params);
            owned.zeroize();
            result
        })
        .await
        .map_err(|e| AppError::HashingFailed(e.to_string()))?
    }

    /// Verify on the blocking pool; always yields a definite answer
    pub async fn verify(&self, plain: &str, hash: &str) -> bool {
        let mut owned = plain.to_string();
        let hash = hash.to_string();
        match tokio::task::spawn_blocking(move || {
            let ok = verify_password(&hash, &owned);
            owned.zeroize();
            ok
        })
        .await
        {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(error = %e, "password verification task failed");
                false
            },
        }
    }

    /// Burn one verification for a login key that does not exist. Always false.
    pub async fn verify_absent(&self, plain: &str) -> bool {
        let dummy = self.dummy_hash.clone();
        let _ = self.verify(plain, &dummy).await;
        false
    }
}
