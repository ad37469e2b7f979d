// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Server-side session table.
//!
//! The client only ever holds the opaque session token (in a cookie). What
//! the session is bound to lives here: either nothing (`Anonymous`) or the
//! compact identity token produced by [`super::IdentitySerializer`].
use super::token_generator::generate_secure_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};
use metrics::{counter, gauge};
use secrets_common::Provider;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Absolute session timeout
pub const SESSION_ABSOLUTE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days
/// Idle session timeout
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60 * 2);

/// What a session is currently bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    /// Holds the serialized identity, never the record itself
    Authenticated { identity: String },
}

#[derive(Debug, Clone)]
struct PendingOAuth {
    provider: Provider,
    state: String,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    state: SessionState,
    oauth: Option<PendingOAuth>,
    created_at: Instant,
    last_active: Instant,
}

impl SessionEntry {
    fn new(state: SessionState) -> Self {
        let now = Instant::now();
        Self {
            state,
            oauth: None,
            created_at: now,
            last_active: now,
        }
    }

    fn is_expired(&self, now: Instant, absolute_ttl: Duration, idle_ttl: Duration) -> bool {
        now.duration_since(self.created_at) >= absolute_ttl
            || now.duration_since(self.last_active) >= idle_ttl
    }
}

/// Session manager for handling session tokens
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    absolute_ttl: Duration,
    idle_ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::new_with_timeouts(SESSION_ABSOLUTE_TTL, SESSION_IDLE_TTL)
    }

    pub fn new_with_timeouts(absolute_ttl: Duration, idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            absolute_ttl,
            idle_ttl,
        }
    }

    async fn insert(&self, entry: SessionEntry) -> String {
        let token = generate_secure_token();
        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), entry);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        token
    }

    /// Create an anonymous session
    pub async fn create_session(&self) -> String {
        self.insert(SessionEntry::new(SessionState::Anonymous)).await
    }

    /// Current state of a live session; refreshes its idle timer.
    /// Expired sessions are dropped and reported as absent.
    pub async fn state(&self, token: &str) -> Option<SessionState> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token)?;
        if entry.is_expired(now, self.absolute_ttl, self.idle_ttl) {
            sessions.remove(token);
            counter!(SESSION_EXPIRED).increment(1);
            return None;
        }
        entry.last_active = now;
        Some(entry.state.clone())
    }

    /// Bind an identity, rotating the token. The previous session (if any)
    /// is destroyed and the returned token replaces it.
    pub async fn authenticate(&self, previous: Option<&str>, identity: String) -> String {
        if let Some(old) = previous {
            self.remove_session(old).await;
        }
        self.insert(SessionEntry::new(SessionState::Authenticated { identity }))
            .await
    }

    /// Drop the identity binding but keep the session
    pub async fn reset(&self, token: &str) {
        if let Some(entry) = self.sessions.write().await.get_mut(token) {
            entry.state = SessionState::Anonymous;
        }
    }

    /// Remove a session by token; true if it existed
    pub async fn remove_session(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Remember the CSRF state of a federated login in progress.
    /// False if the session is gone.
    pub async fn set_oauth_state(&self, token: &str, provider: Provider, state: String) -> bool {
        match self.sessions.write().await.get_mut(token) {
            Some(entry) => {
                entry.oauth = Some(PendingOAuth { provider, state });
                true
            },
            None => false,
        }
    }

    /// Take (one-shot) the pending CSRF state for `provider`
    pub async fn take_oauth_state(&self, token: &str, provider: Provider) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let pending = sessions.get_mut(token)?.oauth.take()?;
        (pending.provider == provider).then_some(pending.state)
    }

    /// Remove every expired session; returns how many were removed
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before_count = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(now, self.absolute_ttl, self.idle_ttl));
        let removed = before_count - sessions.len();

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
        removed
    }

    /// Return count of live sessions
    pub async fn active_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
