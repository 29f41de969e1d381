//! Secret storage abstraction.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretStore`] - Trait for secret storage backends
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`KeyringStore`] - OS vault implementation (with `keyring-store` feature)
//! - [`GitCredentialStore`] - git-credential-helper implementation
//! - [`create_store`] - Helper to select a backend for a deployment
//!
//! # Storage Key Convention
//!
//! Keys are built from [`SecretKey`](crate::model::SecretKey):
//! `{kind}:{tenant}` for tenant-wide secrets, `{kind}:{tenant}:{repo}` for
//! repository-scoped ones. Which scopes a backend can address is the
//! backend's business; callers never branch on backend identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{SecretKey, SecretKind, TenantId};

mod git_credential;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;

pub use git_credential::GitCredentialStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value.
#[derive(Clone, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for secret store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Access to the secret was denied.
    #[error("access denied to secret: {key}")]
    AccessDenied { key: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// The vault backend is not available on this platform.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },
}

/// Abstraction over secret storage backends.
///
/// Implementations include:
/// - [`MemoryStore`] - In-memory storage for testing
/// - [`KeyringStore`] (with `keyring-store` feature) - OS vault
/// - [`GitCredentialStore`] - git credential helper subprocess
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &SecretKey) -> Result<Option<Secret>, StoreError>;

    /// Store a secret at the given key.
    ///
    /// Overwrites any existing value.
    async fn set(&self, key: &SecretKey, secret: &Secret) -> Result<(), StoreError>;

    /// Delete a secret by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn delete(&self, key: &SecretKey) -> Result<(), StoreError>;

    /// Remove every secret of every kind and scope stored for a tenant.
    ///
    /// Idempotent; a tenant with nothing stored is not an error.
    async fn purge_tenant(&self, tenant: &TenantId) -> Result<(), StoreError>;

    /// List all storage keys matching a prefix.
    ///
    /// Backends without enumeration support return a `BackendError`;
    /// callers that can proceed without it should treat the error as
    /// an empty listing.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Look up a usable token of the given kind for a tenant.
///
/// Prefers the tenant-wide entry; when the backend supports enumeration,
/// falls back to the first repository-scoped entry (every repo scope of a
/// single login carries the same token value).
pub async fn find_token(
    store: &dyn SecretStore,
    kind: SecretKind,
    tenant: &TenantId,
) -> Result<Option<Secret>, StoreError> {
    let unscoped = SecretKey::tenant_wide(kind, tenant.clone());
    if let Some(secret) = store.get(&unscoped).await? {
        return Ok(Some(secret));
    }

    let prefix = SecretKey::kind_prefix(kind, tenant);
    let mut keys = match store.list_keys(&prefix).await {
        Ok(keys) => keys,
        // Enumeration unsupported (e.g. OS vault); nothing more to try.
        Err(StoreError::BackendError { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    keys.sort();

    for key in keys {
        if let Some(repo) = key.strip_prefix(&prefix).and_then(|s| s.strip_prefix(':')) {
            let scoped = SecretKey::repo_scoped(kind, tenant.clone(), repo);
            if let Some(secret) = store.get(&scoped).await? {
                return Ok(Some(secret));
            }
        }
    }
    Ok(None)
}

/// Create a secret store for this deployment.
///
/// When `prefer_keyring` is `true` and the `keyring-store` feature is
/// enabled, attempts the OS vault and falls back to the git credential
/// helper if the vault is unavailable. Otherwise returns the credential
/// helper backend, which degrades to "no secret" rather than failing when
/// no helper is configured.
///
/// `endpoint` is the configured API endpoint, used by the helper backend
/// to derive the credential host and path.
pub fn create_store(prefer_keyring: bool, endpoint: Option<&str>) -> Box<dyn SecretStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringStore::try_new("lfsctl") {
            Ok(store) => {
                tracing::debug!("using OS keyring for secret storage");
                return Box::new(store);
            }
            Err(e) => {
                tracing::warn!(
                    "keyring unavailable ({}), falling back to git credential helper",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!(
            "keyring storage requested but keyring-store feature not enabled, \
             using git credential helper"
        );
    }

    tracing::debug!("using git credential helper for secret storage");
    Box::new(GitCredentialStore::new(endpoint.map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_find_token_prefers_tenant_wide() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("acme");

        store
            .set(
                &SecretKey::repo_scoped(SecretKind::SessionToken, "acme", "r1"),
                &Secret::new("scoped"),
            )
            .await
            .unwrap();
        store
            .set(
                &SecretKey::tenant_wide(SecretKind::SessionToken, "acme"),
                &Secret::new("wide"),
            )
            .await
            .unwrap();

        let found = find_token(&store, SecretKind::SessionToken, &tenant)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.expose(), "wide");
    }

    #[tokio::test]
    async fn test_find_token_falls_back_to_repo_scope() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("acme");

        store
            .set(
                &SecretKey::repo_scoped(SecretKind::SessionToken, "acme", "r1"),
                &Secret::new("tok_1"),
            )
            .await
            .unwrap();

        let found = find_token(&store, SecretKind::SessionToken, &tenant)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.expose(), "tok_1");
    }

    #[tokio::test]
    async fn test_find_token_absent() {
        let store = MemoryStore::new();
        let tenant = TenantId::new("acme");
        let found = find_token(&store, SecretKind::SessionToken, &tenant)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
