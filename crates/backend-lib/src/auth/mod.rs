// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod federated;
pub mod password;
pub mod provider;
pub mod rate_limit;
pub mod resolver;
pub mod serializer;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use federated::FederatedLinker;
pub use password::{
    hash_password, validate_password_strength, verify_password, PasswordRequirements,
    PasswordService,
};
pub use provider::{OAuthProviderClient, ProviderClient, ProviderRegistry};
pub use rate_limit::AuthRateLimiter;
pub use resolver::SessionResolver;
pub use serializer::{IdentitySerializer, SessionIdentity};
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use session::{SessionManager, SessionState, SESSION_ABSOLUTE_TTL, SESSION_IDLE_TTL};
