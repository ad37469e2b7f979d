use super::{AuthRateLimiter, AuthService, PasswordService};
use crate::error::AppError;
use crate::metrics::{LOGIN_FAILED, LOGIN_SUCCEEDED, REGISTERED};
use crate::storage::CredentialStore;
use crate::validation;
use async_trait::async_trait;
use metrics::counter;
use secrets_common::{Credentials, Identity, NewIdentity};

pub struct DefaultAuth<S> {
    storage: S,
    passwords: PasswordService,
    rate_limiter: AuthRateLimiter,
}

impl<S: CredentialStore> DefaultAuth<S> {
    pub fn new(storage: S, passwords: PasswordService, rate_limiter: AuthRateLimiter) -> Self {
        Self {
            storage,
            passwords,
            rate_limiter,
        }
    }

    fn reject(&self, username: &str) -> AppError {
        self.rate_limiter.record_failed_attempt(username);
        counter!(LOGIN_FAILED).increment(1);
        tracing::warn!("login rejected");
        AppError::InvalidCredentials
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> AuthService for DefaultAuth<S> {
    async fn register(&self, credentials: &Credentials) -> Result<Identity, AppError> {
        validation::validate_registration(credentials, self.passwords.requirements())?;

        let hash = self.passwords.hash(&credentials.password).await?;
        let identity = self
            .storage
            .create(NewIdentity::local(credentials.username.clone(), hash))
            .await?;

        counter!(REGISTERED).increment(1);
        tracing::info!(id = %identity.id, "identity registered");
        Ok(identity)
    }

    async fn login(&self, credentials: &Credentials) -> Result<Identity, AppError> {
        let username = credentials.username.as_str();
        // Malformed keys can never match a record and stay out of the limiter
        if validation::validate_username(username).is_err() {
            self.passwords.verify_absent(&credentials.password).await;
            counter!(LOGIN_FAILED).increment(1);
            tracing::warn!("login rejected, malformed login key");
            return Err(AppError::InvalidCredentials);
        }
        if !self.rate_limiter.check_rate_limit(username) {
            tracing::warn!("login attempt for locked-out key");
            return Err(AppError::AuthRateLimited);
        }

        let identity = match self.storage.find_by_login_key(username).await {
            Ok(identity) => identity,
            Err(AppError::NotFound(_)) => {
                self.passwords.verify_absent(&credentials.password).await;
                return Err(self.reject(username));
            },
            Err(e) => return Err(e),
        };

        // Federated-only identities have no password to match
        let verified = match identity.password_hash.as_deref() {
            Some(hash) => self.passwords.verify(&credentials.password, hash).await,
            None => self.passwords.verify_absent(&credentials.password).await,
        };
        if !verified {
            return Err(self.reject(username));
        }

        self.rate_limiter.record_success(username);
        counter!(LOGIN_SUCCEEDED).increment(1);
        tracing::info!(id = %identity.id, "password login succeeded");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordSettings;
    use crate::storage::FlatFileStorage;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(max_attempts: u32) -> (DefaultAuth<FlatFileStorage>, FlatFileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();
        let passwords = PasswordService::new(&PasswordSettings {
            log_n: 4,
            ..PasswordSettings::default()
        })
        .unwrap();
        let limiter = AuthRateLimiter::new(max_attempts, Duration::from_secs(60));
        (
            DefaultAuth::new(storage.clone(), passwords, limiter),
            storage,
            temp_dir,
        )
    }

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (auth, storage, _temp_dir) = setup(5);
        let alice = auth.register(&creds("alice", "secret123")).await.unwrap();

        let stored = storage.find_by_login_key("alice").await.unwrap();
        let hash = stored.password_hash.unwrap();
        assert!(hash.starts_with("$scrypt$"));
        assert!(!hash.contains("secret123"));

        let logged_in = auth.login(&creds("alice", "secret123")).await.unwrap();
        assert_eq!(logged_in.id, alice.id);

        let err = auth.login(&creds("alice", "wrongpass")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_user_looks_like_wrong_password() {
        let (auth, _storage, _temp_dir) = setup(5);
        let err = auth.login(&creds("nobody", "secret123")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let (auth, storage, _temp_dir) = setup(5);
        auth.register(&creds("alice", "secret123")).await.unwrap();
        let err = auth.register(&creds("alice", "another-pass")).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateKey { field: "username" }));
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_policy_violations() {
        let (auth, storage, _temp_dir) = setup(5);
        let err = auth.register(&creds("alice", "short")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = auth.register(&creds("al ice", "secret123")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let (auth, _storage, _temp_dir) = setup(2);
        auth.register(&creds("alice", "secret123")).await.unwrap();

        for _ in 0..2 {
            let err = auth.login(&creds("alice", "wrongpass")).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        // Locked even with the right password
        let err = auth.login(&creds("alice", "secret123")).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRateLimited));
    }

    #[tokio::test]
    async fn test_failed_logins_do_not_grow_the_limiter() {
        let (auth, _storage, _temp_dir) = setup(5);

        let oversized = "x".repeat(300);
        for key in [oversized.as_str(), "", "has space"] {
            let err = auth.login(&creds(key, "secret123")).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        assert_eq!(auth.rate_limiter.tracked_keys(), 0);

        let (capped, _storage, _temp_dir) = setup(5);
        let capped = DefaultAuth {
            rate_limiter: AuthRateLimiter::new(5, Duration::from_secs(60))
                .with_max_tracked_keys(3),
            ..capped
        };
        for i in 0..10 {
            let err = capped
                .login(&creds(&format!("nobody-{i}"), "secret123"))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
        assert_eq!(capped.rate_limiter.tracked_keys(), 3);
    }

    #[tokio::test]
    async fn test_federated_identity_has_no_password_login() {
        let (auth, storage, _temp_dir) = setup(5);
        let mut fields = NewIdentity::federated(secrets_common::Provider::Google, "g-1");
        fields.username = Some("fed".to_string());
        storage.create(fields).await.unwrap();

        let err = auth.login(&creds("fed", "anything1")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }
}
