// ============================
// crates/backend-lib/src/auth/serializer.rs
// ============================
/** Compact identity tokens stored in sessions
A token is `base64url(nonce || AES-256-GCM(json))` where the JSON carries
only what is needed to re-fetch the record. The key is derived from the
configured session secret, so tokens minted under another secret (or
tampered with) fail to open. */
use super::token_generator::random_bytes;
use crate::error::AppError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use secrets_common::{Identity, IdentityId};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;
const KEY_SALT: &[u8] = b"secrets-board/identity-token/v1";

/// Minimal identity fields carried by a session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<&Identity> for SessionIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
        }
    }
}

/// Seals and opens identity tokens
#[derive(Clone)]
pub struct IdentitySerializer {
    cipher: Aes256Gcm,
}

impl IdentitySerializer {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        let params = scrypt::Params::new(12, 8, 1, 32)
            .map_err(|e| AppError::Internal(format!("key derivation parameters: {e}")))?;
        let mut key = [0u8; 32];
        scrypt::scrypt(secret.as_bytes(), KEY_SALT, &params, &mut key)
            .map_err(|e| AppError::Internal(format!("key derivation failed: {e}")))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AppError::Internal(format!("invalid session key: {e}")));
        key.zeroize();
        Ok(Self { cipher: cipher? })
    }

    pub fn serialize(&self, identity: &Identity) -> Result<String, AppError> {
        let json = serde_json::to_vec(&SessionIdentity::from(identity))?;
        let nonce_bytes = random_bytes(NONCE_LEN);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), json.as_slice())
            .map_err(|_| AppError::Internal("identity token encryption failed".to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + sealed.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(combined))
    }

    pub fn deserialize(&self, token: &str) -> Result<SessionIdentity, AppError> {
        let combined = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AppError::InvalidSession)?;
        if combined.len() <= NONCE_LEN {
            return Err(AppError::InvalidSession);
        }
        let (nonce, sealed) = combined.split_at(NONCE_LEN);
        let json = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| AppError::InvalidSession)?;
        serde_json::from_slice(&json).map_err(|_| AppError::InvalidSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrets_common::NewIdentity;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_token_recovers_identity_id() {
        let serializer = IdentitySerializer::new(SECRET).unwrap();
        let identity = NewIdentity::local("alice", "$scrypt$hash").into_identity();

        let token = serializer.serialize(&identity).unwrap();
        let restored = serializer.deserialize(&token).unwrap();

        assert_eq!(restored.id, identity.id);
        assert_eq!(restored.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_token_does_not_embed_password_hash() {
        let serializer = IdentitySerializer::new(SECRET).unwrap();
        let identity = NewIdentity::local("alice", "$scrypt$very-secret-hash").into_identity();

        let token = serializer.serialize(&identity).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let opened = serializer
            .cipher
            .decrypt(Nonce::from_slice(&raw[..NONCE_LEN]), &raw[NONCE_LEN..])
            .unwrap();
        let json = String::from_utf8(opened).unwrap();
        assert!(!json.contains("very-secret-hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_tampered_or_foreign_tokens_are_invalid() {
        let serializer = IdentitySerializer::new(SECRET).unwrap();
        let other = IdentitySerializer::new("fedcba9876543210fedcba9876543210").unwrap();
        let identity = NewIdentity::local("alice", "$scrypt$hash").into_identity();
        let token = serializer.serialize(&identity).unwrap();

        assert!(matches!(other.deserialize(&token), Err(AppError::InvalidSession)));

        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        assert!(matches!(serializer.deserialize(&tampered), Err(AppError::InvalidSession)));

        assert!(matches!(serializer.deserialize("!!"), Err(AppError::InvalidSession)));
        assert!(matches!(serializer.deserialize(""), Err(AppError::InvalidSession)));
    }
}
