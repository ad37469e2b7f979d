// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Credential store abstraction with a flat-file implementation.
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use secrets_common::{
    Identity, IdentityId, IdentityUpdate, NewIdentity, Provider, ProviderProfile, SecretEntry,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};

/// Name of the identity collection inside the data directory
pub const IDENTITIES_FILE: &str = "identities.json";

/// Trait for credential storage backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new record; `DuplicateKey` if the login key or a provider id is taken
    async fn create(&self, fields: NewIdentity) -> Result<Identity, AppError>;

    async fn find_by_id(&self, id: IdentityId) -> Result<Identity, AppError>;

    async fn find_by_login_key(&self, key: &str) -> Result<Identity, AppError>;

    /// Lookup keyed on `provider`'s own id field
    async fn find_by_provider_id(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Identity, AppError>;

    /// Atomic: concurrent identical calls create at most one record.
    /// The flag is true when this call created it.
    async fn find_or_create_by_provider_id(
        &self,
        provider: Provider,
        provider_id: &str,
        defaults: &ProviderProfile,
    ) -> Result<(Identity, bool), AppError>;

    async fn update_secret(&self, id: IdentityId, text: &str) -> Result<Identity, AppError>;

    async fn update(&self, id: IdentityId, fields: IdentityUpdate) -> Result<Identity, AppError>;

    /// Every record with a secret payload, oldest first
    async fn list_secrets(&self) -> Result<Vec<SecretEntry>, AppError>;

    async fn count(&self) -> Result<usize, AppError>;
}

/// Flat-file implementation of the CredentialStore trait.
///
/// The collection is a single JSON document. Every call re-reads it from
/// disk inside one critical section and mutations are written to a temp file
/// then renamed over the original, so readers never see a torn write.
#[derive(Clone)]
pub struct FlatFileStorage {
    root: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FlatFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn collection_path(&self) -> PathBuf {
        self.root.join(IDENTITIES_FILE)
    }

    async fn load(&self) -> Result<Vec<Identity>, AppError> {
        let path = self.collection_path();
        let content = match tokio_fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&path, e)),
        };
        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&content)?)
    }

    async fn persist(&self, records: &[Identity]) -> Result<(), AppError> {
        let path = self.collection_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(records)?;

        let mut file = tokio_fs::File::create(&tmp)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        file.write_all(&json).await.map_err(|e| storage_error(&tmp, e))?;
        file.sync_all().await.map_err(|e| storage_error(&tmp, e))?;
        drop(file);

        tokio_fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error(&path, e))
    }

    fn ensure_unique(records: &[Identity], candidate: &Identity) -> Result<(), AppError> {
        for other in records.iter().filter(|r| r.id != candidate.id) {
            if candidate.username.is_some() && other.username == candidate.username {
                return Err(AppError::DuplicateKey { field: "username" });
            }
            for provider in Provider::ALL {
                if let Some(id) = candidate.provider_id(provider) {
                    if other.provider_id(provider) == Some(id) {
                        return Err(AppError::DuplicateKey {
                            field: provider.id_field(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    async fn modify<F>(&self, id: IdentityId, apply: F) -> Result<Identity, AppError>
    where
        F: FnOnce(&mut Identity) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("identity {id}")))?;

        let mut updated = records[index].clone();
        apply(&mut updated);
        updated.updated_at = Utc::now();
        Self::ensure_unique(&records, &updated)?;

        records[index] = updated.clone();
        self.persist(&records).await?;
        Ok(updated)
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> AppError {
    AppError::StorageUnavailable(format!("{}: {err}", path.display()))
}

#[async_trait]
impl CredentialStore for FlatFileStorage {
    async fn create(&self, fields: NewIdentity) -> Result<Identity, AppError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let identity = fields.into_identity();
        if !identity.can_authenticate() {
            return Err(AppError::InvalidInput(
                "identity needs a password or a provider account".to_string(),
            ));
        }
        Self::ensure_unique(&records, &identity)?;

        records.push(identity.clone());
        self.persist(&records).await?;
        tracing::debug!(id = %identity.id, "identity created");
        Ok(identity)
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Identity, AppError> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("identity {id}")))
    }

    async fn find_by_login_key(&self, key: &str) -> Result<Identity, AppError> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|r| r.username.as_deref() == Some(key))
            .ok_or_else(|| AppError::NotFound("login key".to_string()))
    }

    async fn find_by_provider_id(
        &self,
        provider: Provider,
        provider_id: &str,
    ) -> Result<Identity, AppError> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|r| r.provider_id(provider) == Some(provider_id))
            .ok_or_else(|| AppError::NotFound(format!("{provider} account")))
    }

    async fn find_or_create_by_provider_id(
        &self,
        provider: Provider,
        provider_id: &str,
        defaults: &ProviderProfile,
    ) -> Result<(Identity, bool), AppError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if let Some(found) = records
            .iter()
            .find(|r| r.provider_id(provider) == Some(provider_id))
        {
            return Ok((found.clone(), false));
        }

        let identity = NewIdentity::federated(provider, provider_id).into_identity();
        records.push(identity.clone());
        self.persist(&records).await?;
        tracing::debug!(
            id = %identity.id,
            %provider,
            has_email = defaults.email.is_some(),
            "federated identity created"
        );
        Ok((identity, true))
    }

    async fn update_secret(&self, id: IdentityId, text: &str) -> Result<Identity, AppError> {
        self.update(id, IdentityUpdate::secret(text)).await
    }

    async fn update(&self, id: IdentityId, fields: IdentityUpdate) -> Result<Identity, AppError> {
        if fields.is_empty() {
            return self.find_by_id(id).await;
        }
        self.modify(id, move |identity| {
            if let Some(secret) = fields.secret {
                identity.secret = Some(secret);
            }
            if let Some(google_id) = fields.google_id {
                identity.google_id = Some(google_id);
            }
            if let Some(facebook_id) = fields.facebook_id {
                identity.facebook_id = Some(facebook_id);
            }
        })
        .await
    }

    async fn list_secrets(&self) -> Result<Vec<SecretEntry>, AppError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        records.sort_by_key(|r| r.created_at);
        Ok(records
            .into_iter()
            .filter_map(|r| {
                r.secret.map(|secret| SecretEntry { id: r.id, secret })
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, AppError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }
}
