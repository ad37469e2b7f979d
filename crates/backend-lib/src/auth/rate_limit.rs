// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for password login attempts, keyed by login key.

use crate::config::AuthRateLimitSettings;
use crate::metrics::LOGIN_LOCKED_OUT;
use dashmap::DashMap;
use metrics::counter;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Failed attempts older than this no longer count
const ATTEMPT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on tracked login keys
const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    failed_attempts: u32,
    last_failure: Instant,
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for authentication attempts
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
    max_tracked_keys: usize,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from(&AuthRateLimitSettings::default())
    }
}

impl From<&AuthRateLimitSettings> for AuthRateLimiter {
    fn from(settings: &AuthRateLimitSettings) -> Self {
        Self::new(settings.max_attempts, settings.lockout())
            .with_max_tracked_keys(settings.max_tracked_keys)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
        }
    }

    pub fn with_max_tracked_keys(mut self, max_tracked_keys: usize) -> Self {
        self.max_tracked_keys = max_tracked_keys;
        self
    }

    /// Number of login keys with failures on record
    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }

    /// Record a failed authentication attempt
    pub fn record_failed_attempt(&self, key: &str) {
        let now = Instant::now();

        if !self.attempts.contains_key(key) && self.attempts.len() >= self.max_tracked_keys {
            self.cleanup();
            if self.attempts.len() >= self.max_tracked_keys {
                tracing::warn!(
                    tracked = self.attempts.len(),
                    "failed-login table full, attempt not recorded"
                );
                return;
            }
        }

        let mut entry = self
            .attempts
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // A lapsed lockout or a stale streak starts over
        let lapsed = entry.lockout_expiry.is_some_and(|expiry| now >= expiry);
        if lapsed || now.duration_since(entry.last_failure) >= ATTEMPT_WINDOW {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            counter!(LOGIN_LOCKED_OUT).increment(1);
            tracing::warn!(
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "login key locked out after repeated failures"
            );
        }
    }

    /// Record a successful authentication
    pub fn record_success(&self, key: &str) {
        self.attempts.remove(key);
    }

    /// Check if a login key may attempt authentication
    pub fn check_rate_limit(&self, key: &str) -> bool {
        match self.attempts.get(key) {
            Some(entry) => match entry.lockout_expiry {
                Some(expiry) => Instant::now() >= expiry,
                None => true,
            },
            None => true,
        }
    }

    /// Drop lapsed lockouts and stale streaks
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.lockout_expiry {
            Some(expiry) => now < expiry,
            None => now.duration_since(entry.last_failure) < ATTEMPT_WINDOW,
        });
    }
}
