// ================
// crates/common/src/lib.rs
// ================
//! Common types shared between the secrets board server and its clients.
//! This module defines the identity record, the federated provider set and
//! the form payloads accepted by the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable identifier assigned to an identity at creation
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IdentityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Federated identity providers
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    /// Every supported provider
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Facebook];

    /// Path segment and config key for this provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }

    /// Name of the identity field holding this provider's account id
    pub fn id_field(&self) -> &'static str {
        match self {
            Provider::Google => "google_id",
            Provider::Facebook => "facebook_id",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment names no known provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl fmt::Display for UnknownProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown provider: {}", self.0)
    }
}

impl std::error::Error for UnknownProvider {}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// One registered identity
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Immutable identifier
    pub id: IdentityId,
    /// Local login key (email or username); absent for federated-only identities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// scrypt PHC string; absent for federated-only identities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Google account id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Facebook account id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook_id: Option<String>,
    /// Free-text payload shown on the secrets board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// The id this identity holds for `provider`, if linked
    pub fn provider_id(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_id.as_deref(),
            Provider::Facebook => self.facebook_id.as_deref(),
        }
    }

    /// Whether any login path (password or provider) can reach this record
    pub fn can_authenticate(&self) -> bool {
        self.password_hash.is_some() || Provider::ALL.iter().any(|p| self.provider_id(*p).is_some())
    }
}

/// Fields supplied when creating an identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIdentity {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
}

impl NewIdentity {
    /// A locally registered identity
    pub fn local(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password_hash: Some(password_hash.into()),
            ..Self::default()
        }
    }

    /// An identity created on first federated login
    pub fn federated(provider: Provider, provider_id: impl Into<String>) -> Self {
        let provider_id = Some(provider_id.into());
        match provider {
            Provider::Google => Self {
                google_id: provider_id,
                ..Self::default()
            },
            Provider::Facebook => Self {
                facebook_id: provider_id,
                ..Self::default()
            },
        }
    }

    /// Materialise the record with a fresh id and timestamps
    pub fn into_identity(self) -> Identity {
        let now = Utc::now();
        Identity {
            id: IdentityId::new(),
            username: self.username,
            password_hash: self.password_hash,
            google_id: self.google_id,
            facebook_id: self.facebook_id,
            secret: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; only `Some` fields are written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub secret: Option<String>,
    pub google_id: Option<String>,
    pub facebook_id: Option<String>,
}

impl IdentityUpdate {
    /// Update that links `provider_id` for `provider`
    pub fn link(provider: Provider, provider_id: impl Into<String>) -> Self {
        let provider_id = Some(provider_id.into());
        match provider {
            Provider::Google => Self {
                google_id: provider_id,
                ..Self::default()
            },
            Provider::Facebook => Self {
                facebook_id: provider_id,
                ..Self::default()
            },
        }
    }

    /// Update that sets the secret payload
    pub fn secret(text: impl Into<String>) -> Self {
        Self {
            secret: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.secret.is_none() && self.google_id.is_none() && self.facebook_id.is_none()
    }
}

/// Profile returned by a provider after a successful handshake
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Provider-assigned account id
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// One row of the public secrets listing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub id: IdentityId,
    pub secret: String,
}

/// Body of `GET /secrets`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretListing {
    pub secrets: Vec<SecretEntry>,
}

/// Form body of `POST /login` and `POST /register`
#[derive(Serialize, Deserialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Form body of `POST /submit`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SecretSubmission {
    pub secret: String,
}
