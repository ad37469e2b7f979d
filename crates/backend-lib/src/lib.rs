// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the secrets board: local and federated authentication, the
//! session-bound access gate and the shared secrets listing.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use crate::auth::{
    AuthRateLimiter, AuthService, DefaultAuth, FederatedLinker, IdentitySerializer,
    PasswordService, ProviderRegistry, SessionManager, SessionResolver,
};
use crate::config::Settings;
use crate::storage::{CredentialStore, FlatFileStorage};
use axum::http::HeaderMap;
use std::sync::Arc;

pub use crate::error::AppError;
pub use crate::router::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState<S> {
    /// Settings the service was started with
    pub settings: Arc<Settings>,
    /// Storage backend
    pub storage: S,
    /// Local username/password authentication
    pub auth: Arc<dyn AuthService>,
    /// Session <-> identity binding
    pub resolver: SessionResolver<S>,
    /// Provider account find-or-create
    pub linker: FederatedLinker<S>,
    /// Configured OAuth providers
    pub providers: ProviderRegistry,
    /// Failed-login lockouts
    pub auth_rate_limiter: AuthRateLimiter,
}

impl<S: CredentialStore + Clone + 'static> AppState<S> {
    /// Create a new application state. Providers present in the settings
    /// get live OAuth clients.
    pub fn new(storage: S, settings: Settings) -> anyhow::Result<Self> {
        let providers = ProviderRegistry::from_settings(&settings.providers)?;
        Self::with_providers(storage, settings, providers)
    }

    /// Create a new application state with an explicit provider registry
    pub fn with_providers(
        storage: S,
        settings: Settings,
        providers: ProviderRegistry,
    ) -> anyhow::Result<Self> {
        let passwords = PasswordService::new(&settings.password)?;
        let auth_rate_limiter = AuthRateLimiter::from(&settings.rate_limit);
        let auth = Arc::new(DefaultAuth::new(
            storage.clone(),
            passwords,
            auth_rate_limiter.clone(),
        ));

        let sessions = SessionManager::new_with_timeouts(
            settings.session.absolute_ttl(),
            settings.session.idle_ttl(),
        );
        let serializer = IdentitySerializer::new(&settings.session.secret)?;
        let resolver = SessionResolver::new(sessions, serializer, storage.clone());
        let linker = FederatedLinker::new(storage.clone());

        Ok(Self {
            settings: Arc::new(settings),
            storage,
            auth,
            resolver,
            linker,
            providers,
            auth_rate_limiter,
        })
    }

    /// Sweep expired sessions and lapsed lockouts. Returns the number of
    /// sessions removed.
    pub async fn cleanup(&self) -> usize {
        self.auth_rate_limiter.cleanup();
        self.resolver.sessions().cleanup_expired_sessions().await
    }
}

impl AppState<FlatFileStorage> {
    /// State backed by flat files under `settings.data_dir`
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let storage = FlatFileStorage::new(&settings.data_dir)?;
        Self::new(storage, settings)
    }
}

impl<S> AppState<S> {
    /// Session token from the request cookies
    pub fn session_token(&self, headers: &HeaderMap) -> Option<String> {
        middleware::cookie::session_token(headers, &self.settings.session.cookie_name)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        middleware::cookie::session_cookie(&self.settings.session, token)
    }

    pub fn clear_session_cookie(&self) -> String {
        middleware::cookie::clear_session_cookie(&self.settings.session)
    }
}
