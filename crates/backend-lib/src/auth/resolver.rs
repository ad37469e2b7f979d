// ============================
// crates/backend-lib/src/auth/resolver.rs
// ============================
//! Session identity resolution.
//!
//! Per client session the state is `Anonymous` or `Authenticated(id)`.
//! Password login and federated callbacks both end in [`SessionResolver::login`];
//! every later request goes through [`SessionResolver::current_identity`],
//! which re-fetches the record so that a stale or forged binding falls back
//! to `Anonymous` instead of authorising anything.
use super::serializer::IdentitySerializer;
use super::session::{SessionManager, SessionState};
use crate::error::AppError;
use crate::storage::CredentialStore;
use secrets_common::{Identity, Provider};

#[derive(Clone)]
pub struct SessionResolver<S> {
    sessions: SessionManager,
    serializer: IdentitySerializer,
    storage: S,
}

impl<S: CredentialStore> SessionResolver<S> {
    pub fn new(sessions: SessionManager, serializer: IdentitySerializer, storage: S) -> Self {
        Self {
            sessions,
            serializer,
            storage,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Anonymous -> Authenticated. Returns the rotated session token.
    pub async fn login(
        &self,
        current: Option<&str>,
        identity: &Identity,
    ) -> Result<String, AppError> {
        let token = self.serializer.serialize(identity)?;
        let session = self.sessions.authenticate(current, token).await;
        tracing::debug!(id = %identity.id, "session bound to identity");
        Ok(session)
    }

    /// Authenticated -> gone. The client gets a fresh anonymous session on
    /// its next request that needs one.
    pub async fn logout(&self, current: Option<&str>) {
        if let Some(token) = current {
            if self.sessions.remove_session(token).await {
                tracing::debug!("session destroyed on logout");
            }
        }
    }

    /// The identity bound to this session, if any. An unreadable binding or
    /// a record that no longer exists resets the session to `Anonymous`;
    /// storage failures propagate.
    pub async fn current_identity(
        &self,
        current: Option<&str>,
    ) -> Result<Option<Identity>, AppError> {
        let Some(token) = current else {
            return Ok(None);
        };
        let serialized = match self.sessions.state(token).await {
            Some(SessionState::Authenticated { identity }) => identity,
            Some(SessionState::Anonymous) | None => return Ok(None),
        };

        let session_identity = match self.serializer.deserialize(&serialized) {
            Ok(session_identity) => session_identity,
            Err(_) => {
                tracing::warn!("unreadable identity binding, resetting session");
                self.sessions.reset(token).await;
                return Ok(None);
            },
        };

        match self.storage.find_by_id(session_identity.id).await {
            Ok(identity) => Ok(Some(identity)),
            Err(AppError::NotFound(_)) => {
                tracing::warn!(id = %session_identity.id, "session bound to missing identity");
                self.sessions.reset(token).await;
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    /// Access gate predicate. Storage failures count as unauthenticated.
    pub async fn is_authenticated(&self, current: Option<&str>) -> bool {
        match self.current_identity(current).await {
            Ok(identity) => identity.is_some(),
            Err(e) => {
                tracing::error!(error = %e, "identity lookup failed during access check");
                false
            },
        }
    }

    /// Make sure the client has a live session, creating an anonymous one
    /// if needed. Returns the token and whether it is new.
    pub async fn ensure_session(&self, current: Option<&str>) -> (String, bool) {
        if let Some(token) = current {
            if self.sessions.state(token).await.is_some() {
                return (token.to_string(), false);
            }
        }
        (self.sessions.create_session().await, true)
    }

    /// Remember the CSRF state of a federated login on this session
    pub async fn begin_federated(&self, token: &str, provider: Provider, state: String) -> bool {
        self.sessions.set_oauth_state(token, provider, state).await
    }

    /// One-shot check of the CSRF state returned by the provider
    pub async fn finish_federated(
        &self,
        current: Option<&str>,
        provider: Provider,
        returned_state: &str,
    ) -> bool {
        let Some(token) = current else {
            return false;
        };
        match self.sessions.take_oauth_state(token, provider).await {
            Some(expected) => !expected.is_empty() && expected == returned_state,
            None => false,
        }
    }
}
