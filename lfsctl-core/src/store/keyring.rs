//! OS vault secret storage implementation.

use async_trait::async_trait;
use keyring::Entry;

use crate::model::{SecretKey, SecretKind, TenantId};

use super::{Secret, SecretStore, StoreError};

/// OS vault secret store.
///
/// This store uses the platform's native secret-management facility:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// # Storage Key Format
///
/// Entries are addressed by a fixed service namespace (set at construction)
/// and an account string of `{kind}:{tenant}`. The vault strategy does not
/// address repository-scoped keys; a scoped key collapses to its tenant-level
/// entry. Every repo scope written by one login carries the same token value,
/// so the collapse loses nothing for resolution or purge.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Try to create a new vault store.
    ///
    /// Returns an error if the keyring backend is not available on this
    /// platform.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        // Probe the backend with a throwaway entry; some platforms only
        // fail at Entry construction time.
        match Entry::new(service_name, "__availability_check__") {
            Ok(_) => Ok(Self {
                service_name: service_name.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    fn entry(&self, key: &SecretKey) -> Result<Entry, StoreError> {
        self.entry_for(&key.tenant_key())
    }

    fn entry_for(&self, account: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, account).map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn get(&self, key: &SecretKey) -> Result<Option<Secret>, StoreError> {
        let entry = self.entry(key)?;

        match entry.get_password() {
            Ok(password) => Ok(Some(Secret::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Err(StoreError::BackendError {
                message: format!("ambiguous keyring entry for key: {}", key),
            }),
            Err(keyring::Error::NoStorageAccess(e)) => Err(StoreError::AccessDenied {
                key: format!("{} ({})", key, e),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn set(&self, key: &SecretKey, secret: &Secret) -> Result<(), StoreError> {
        let entry = self.entry(key)?;

        entry
            .set_password(secret.expose())
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to set keyring password: {}", e),
            })
    }

    async fn delete(&self, key: &SecretKey) -> Result<(), StoreError> {
        let entry = self.entry(key)?;

        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Idempotent delete
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }

    async fn purge_tenant(&self, tenant: &TenantId) -> Result<(), StoreError> {
        // Repo-scoped writes collapse to tenant-level entries, so the two
        // kind entries are the whole footprint of a tenant in the vault.
        for kind in SecretKind::all() {
            let key = SecretKey::tenant_wide(kind, tenant.clone());
            self.delete(&key).await?;
        }
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // Platform vault APIs provide no enumeration; callers treat this
        // as an empty listing.
        Err(StoreError::BackendError {
            message: format!(
                "list_keys not supported by keyring backend (requested prefix: {})",
                prefix
            ),
        })
    }
}
