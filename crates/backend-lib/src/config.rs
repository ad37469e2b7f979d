// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then a TOML file,
//! then `SECRETS_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `SECRETS_SESSION__SECRET`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use secrets_common::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SECRETS_";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const MIN_SECRET_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Directory holding the identity collection
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    pub session: SessionSettings,
    pub password: PasswordSettings,
    pub rate_limit: AuthRateLimitSettings,
    pub providers: ProviderSettings,
}

/// Session cookie and lifetime settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Secret the identity-token key is derived from
    pub secret: String,
    pub cookie_name: String,
    /// Lifetime of a session regardless of activity
    pub absolute_ttl_secs: u64,
    /// Lifetime of a session without requests
    pub idle_ttl_secs: u64,
    /// Mark the cookie `Secure` (set behind TLS)
    pub secure_cookie: bool,
}

/// scrypt work factor and password policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
    pub min_length: usize,
    pub max_length: usize,
}

/// Failed-login lockout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRateLimitSettings {
    pub max_attempts: u32,
    pub lockout_secs: u64,
    /// Upper bound on login keys with failures on record
    pub max_tracked_keys: usize,
}

/// OAuth client registrations; an absent entry disables that provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub google: Option<OAuthProviderSettings>,
    pub facebook: Option<OAuthProviderSettings>,
}

impl ProviderSettings {
    pub fn get(&self, provider: Provider) -> Option<&OAuthProviderSettings> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Facebook => self.facebook.as_ref(),
        }
    }
}

/// One OAuth client registration
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Absolute URL of `/auth/{provider}/secrets` as registered with the provider
    pub callback_url: String,
    /// Endpoint overrides; provider defaults apply when unset
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("secret", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .field("absolute_ttl_secs", &self.absolute_ttl_secs)
            .field("idle_ttl_secs", &self.idle_ttl_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

impl fmt::Debug for OAuthProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            session: SessionSettings::default(),
            password: PasswordSettings::default(),
            rate_limit: AuthRateLimitSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            cookie_name: "secrets_session".to_string(),
            absolute_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            idle_ttl_secs: 60 * 60 * 2,
            secure_cookie: false,
        }
    }
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
            min_length: 8,
            max_length: 128,
        }
    }
}

impl Default for AuthRateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
            max_tracked_keys: 10_000,
        }
    }
}

impl SessionSettings {
    pub fn absolute_ttl(&self) -> Duration {
        Duration::from_secs(self.absolute_ttl_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

impl PasswordSettings {
    /// scrypt parameters for newly created hashes
    pub fn scrypt_params(&self) -> Result<scrypt::Params, ConfigError> {
        scrypt::Params::new(self.log_n, self.r, self.p, scrypt::Params::RECOMMENDED_LEN)
            .map_err(|e| ConfigError::Invalid(format!("password scrypt parameters: {e}")))
    }
}

impl AuthRateLimitSettings {
    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl Settings {
    /// Load from `config.toml` in the working directory and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from an explicit TOML file and the environment. A missing file
    /// is not an error; values then come from defaults and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level `{}`",
                self.log_level
            )));
        }
        if self.session.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "session.secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name is empty".to_string()));
        }
        if self.session.absolute_ttl_secs == 0 || self.session.idle_ttl_secs == 0 {
            return Err(ConfigError::Invalid("session TTLs must be non-zero".to_string()));
        }
        self.password.scrypt_params()?;
        if self.password.min_length == 0 || self.password.min_length > self.password.max_length {
            return Err(ConfigError::Invalid(
                "password length bounds are inconsistent".to_string(),
            ));
        }
        if self.rate_limit.max_attempts == 0 || self.rate_limit.max_tracked_keys == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_attempts and rate_limit.max_tracked_keys must be non-zero"
                    .to_string(),
            ));
        }
        for provider in Provider::ALL {
            if let Some(p) = self.providers.get(provider) {
                if p.client_id.is_empty() || p.client_secret.is_empty() || p.callback_url.is_empty()
                {
                    return Err(ConfigError::Invalid(format!(
                        "providers.{provider} needs client_id, client_secret and callback_url"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn valid() -> Settings {
        let mut settings = Settings::default();
        settings.session.secret = SECRET.to_string();
        settings
    }

    #[test]
    fn test_settings_validation() {
        assert!(valid().validate().is_ok());

        // Missing session secret
        assert!(Settings::default().validate().is_err());

        let mut invalid = valid();
        invalid.log_level = "invalid".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = valid();
        invalid.session.idle_ttl_secs = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = valid();
        invalid.password.r = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = valid();
        invalid.password.min_length = 200;
        assert!(invalid.validate().is_err());

        let mut invalid = valid();
        invalid.rate_limit.max_attempts = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_incomplete_provider_is_rejected() {
        let mut settings = valid();
        settings.providers.google = Some(OAuthProviderSettings {
            client_id: "id".to_string(),
            client_secret: String::new(),
            callback_url: "http://localhost:3000/auth/google/secrets".to_string(),
            auth_url: None,
            token_url: None,
            profile_url: None,
            scopes: None,
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains(SECRET));
    }

    #[test]
    fn test_load_settings() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                &format!(
                    r#"
                    bind_addr = "127.0.0.1:4000"
                    data_dir = "test_data"
                    log_level = "debug"

                    [session]
                    secret = "{SECRET}"
                    idle_ttl_secs = 60

                    [providers.google]
                    client_id = "google-client"
                    client_secret = "google-secret"
                    callback_url = "http://localhost:4000/auth/google/secrets"
                    "#
                ),
            )?;

            // Environment variables take precedence over the file
            jail.set_env("SECRETS_LOG_LEVEL", "info");
            jail.set_env("SECRETS_PASSWORD__LOG_N", "10");

            let settings = Settings::load().expect("settings load");
            assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:4000");
            assert_eq!(settings.data_dir, PathBuf::from("test_data"));
            assert_eq!(settings.log_level, "info");
            assert_eq!(settings.session.idle_ttl_secs, 60);
            assert_eq!(settings.password.log_n, 10);
            // Untouched keys keep their defaults
            assert_eq!(settings.session.cookie_name, "secrets_session");
            assert!(settings.providers.get(Provider::Google).is_some());
            assert!(settings.providers.get(Provider::Facebook).is_none());
            Ok(())
        });
    }

    #[test]
    fn test_load_without_secret_fails() {
        Jail::expect_with(|_jail| {
            assert!(matches!(Settings::load(), Err(ConfigError::Invalid(_))));
            Ok(())
        });
    }
}
