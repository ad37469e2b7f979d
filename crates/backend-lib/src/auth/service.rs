use crate::error::AppError;
use async_trait::async_trait;
use secrets_common::{Credentials, Identity};

/// Local (username + password) authentication
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a local identity with a hashed password.
    /// `InvalidInput` on policy violations, `DuplicateKey` if the username is taken.
    async fn register(&self, credentials: &Credentials) -> Result<Identity, AppError>;

    /// Verify a login attempt. Unknown username and wrong password both yield
    /// `InvalidCredentials`; a locked-out key yields `AuthRateLimited`.
    async fn login(&self, credentials: &Credentials) -> Result<Identity, AppError>;
}
