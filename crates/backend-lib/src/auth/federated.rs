// ============================
// crates/backend-lib/src/auth/federated.rs
// ============================
//! Federated identity linking: maps a provider account onto a local identity.
use crate::error::AppError;
use crate::metrics::{FEDERATED_CREATED, FEDERATED_LOGIN};
use crate::storage::CredentialStore;
use metrics::counter;
use secrets_common::{Identity, IdentityId, IdentityUpdate, Provider, ProviderProfile};

/// Find-or-create for provider accounts
#[derive(Clone)]
pub struct FederatedLinker<S> {
    storage: S,
}

impl<S: CredentialStore> FederatedLinker<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Resolve a provider account to its local identity, creating one on
    /// first login. Lookup is keyed on `provider`'s own id field only.
    pub async fn resolve(
        &self,
        provider: Provider,
        profile: &ProviderProfile,
    ) -> Result<Identity, AppError> {
        if profile.id.is_empty() {
            return Err(AppError::ProviderAuthFailed(format!(
                "{provider}: empty account id"
            )));
        }

        let (identity, created) = self
            .storage
            .find_or_create_by_provider_id(provider, &profile.id, profile)
            .await?;

        counter!(FEDERATED_LOGIN).increment(1);
        if created {
            counter!(FEDERATED_CREATED).increment(1);
            tracing::info!(id = %identity.id, %provider, "new identity from federated login");
        }
        Ok(identity)
    }

    /// Attach a provider account to an identity that is already signed in.
    /// Linking the same account again is a no-op. `DuplicateKey` if the
    /// account is owned by another identity or the identity already holds a
    /// different account of this provider; the record is left unchanged.
    pub async fn link(
        &self,
        id: IdentityId,
        provider: Provider,
        profile: &ProviderProfile,
    ) -> Result<Identity, AppError> {
        let identity = self.storage.find_by_id(id).await?;
        match identity.provider_id(provider) {
            Some(existing) if existing == profile.id => return Ok(identity),
            Some(_) => {
                tracing::warn!(id = %identity.id, %provider, "identity already linked to another account");
                return Err(AppError::DuplicateKey {
                    field: provider.id_field(),
                });
            },
            None => {},
        }
        let linked = self
            .storage
            .update(id, IdentityUpdate::link(provider, profile.id.clone()))
            .await?;
        tracing::info!(id = %linked.id, %provider, "provider linked to identity");
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FlatFileStorage;
    use secrets_common::NewIdentity;
    use tempfile::TempDir;

    fn setup() -> (FederatedLinker<FlatFileStorage>, FlatFileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FlatFileStorage::new(temp_dir.path()).unwrap();
        (FederatedLinker::new(storage.clone()), storage, temp_dir)
    }

    fn profile(id: &str) -> ProviderProfile {
        ProviderProfile {
            id: id.to_string(),
            email: Some("alice@example.com".to_string()),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_passwordless_identity() {
        let (linker, storage, _temp_dir) = setup();
        let identity = linker.resolve(Provider::Google, &profile("g-1")).await.unwrap();

        assert_eq!(identity.google_id.as_deref(), Some("g-1"));
        assert!(identity.password_hash.is_none());
        assert!(identity.username.is_none());

        let again = linker.resolve(Provider::Google, &profile("g-1")).await.unwrap();
        assert_eq!(again.id, identity.id);
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_providers_are_not_cross_linked() {
        let (linker, storage, _temp_dir) = setup();
        let facebook = linker.resolve(Provider::Facebook, &profile("42")).await.unwrap();
        let google = linker.resolve(Provider::Google, &profile("42")).await.unwrap();

        assert_ne!(facebook.id, google.id);
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_matching_email_does_not_merge_with_local_account() {
        let (linker, storage, _temp_dir) = setup();
        let local = storage
            .create(NewIdentity::local("alice@example.com", "$scrypt$hash"))
            .await
            .unwrap();

        let federated = linker.resolve(Provider::Google, &profile("g-5")).await.unwrap();
        assert_ne!(federated.id, local.id);
    }

    #[tokio::test]
    async fn test_empty_provider_id_is_rejected() {
        let (linker, storage, _temp_dir) = setup();
        let err = linker.resolve(Provider::Google, &profile("")).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderAuthFailed(_)));
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_link_additional_provider() {
        let (linker, storage, _temp_dir) = setup();
        let local = storage
            .create(NewIdentity::local("alice", "$scrypt$hash"))
            .await
            .unwrap();

        let linked = linker
            .link(local.id, Provider::Facebook, &profile("f-1"))
            .await
            .unwrap();
        assert_eq!(linked.facebook_id.as_deref(), Some("f-1"));

        // Idempotent
        linker
            .link(local.id, Provider::Facebook, &profile("f-1"))
            .await
            .unwrap();

        // Subsequent federated login lands on the same identity
        let resolved = linker.resolve(Provider::Facebook, &profile("f-1")).await.unwrap();
        assert_eq!(resolved.id, local.id);
    }

    #[tokio::test]
    async fn test_link_does_not_replace_existing_account() {
        let (linker, storage, _temp_dir) = setup();
        let local = storage
            .create(NewIdentity::local("alice", "$scrypt$hash"))
            .await
            .unwrap();
        linker
            .link(local.id, Provider::Google, &profile("g-1"))
            .await
            .unwrap();

        let err = linker
            .link(local.id, Provider::Google, &profile("g-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey { field: "google_id" }));

        let unchanged = storage.find_by_id(local.id).await.unwrap();
        assert_eq!(unchanged.google_id.as_deref(), Some("g-1"));
        let resolved = linker.resolve(Provider::Google, &profile("g-1")).await.unwrap();
        assert_eq!(resolved.id, local.id);
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_link_owned_account_is_duplicate() {
        let (linker, storage, _temp_dir) = setup();
        linker.resolve(Provider::Google, &profile("g-8")).await.unwrap();
        let local = storage
            .create(NewIdentity::local("alice", "$scrypt$hash"))
            .await
            .unwrap();

        let err = linker
            .link(local.id, Provider::Google, &profile("g-8"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey { .. }));
    }
}
