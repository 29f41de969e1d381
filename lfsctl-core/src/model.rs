//! Domain model types for lfsctl.
//!
//! This module defines the core types used throughout the client:
//! - [`TenantId`] - Identifier for a tenant (customer/organization boundary)
//! - [`TenantRecord`] - Persisted metadata about a known tenant
//! - [`SecretKind`] - Which credential a secret-store entry holds
//! - [`SecretKey`] - Composite addressing key for the secret store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a tenant (e.g., "acme", "globex").
///
/// Tenant IDs are normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a new tenant ID.
    ///
    /// The ID is normalized to lowercase.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    /// Get the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Persisted metadata about a tenant the user has interacted with.
///
/// Records are created or refreshed on login and only removed by an
/// explicit logout/removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// The tenant identifier, unique within the session directory.
    pub tenant_id: TenantId,

    /// Human-readable display name.
    pub name: String,

    /// Role granted to the authenticated identity within the tenant.
    pub role: String,
}

/// Which credential a secret-store entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretKind {
    /// Session token issued by the storage service after device-flow login.
    SessionToken,

    /// Identity-provider token written by older releases; retained so
    /// logout and tenant removal scrub it.
    ProviderToken,
}

impl SecretKind {
    /// Stable string used in storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionToken => "session-token",
            Self::ProviderToken => "provider-token",
        }
    }

    /// All kinds, in purge order.
    pub fn all() -> [SecretKind; 2] {
        [Self::SessionToken, Self::ProviderToken]
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composite key addressing one secret in the store.
///
/// A key is `(kind, tenant)` optionally narrowed to a single repository.
/// Absence of a value under a key is a valid state ("not logged in").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretKey {
    /// The credential kind.
    pub kind: SecretKind,

    /// The tenant the secret belongs to.
    pub tenant: TenantId,

    /// Optional repository scope. `None` means tenant-wide.
    pub repo: Option<String>,
}

impl SecretKey {
    /// Create a tenant-wide key.
    pub fn tenant_wide(kind: SecretKind, tenant: impl Into<TenantId>) -> Self {
        Self {
            kind,
            tenant: tenant.into(),
            repo: None,
        }
    }

    /// Create a repository-scoped key.
    pub fn repo_scoped(
        kind: SecretKind,
        tenant: impl Into<TenantId>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            tenant: tenant.into(),
            repo: Some(repo.into()),
        }
    }

    /// Convert to a storage key string.
    ///
    /// Keys follow the pattern `kind:tenant` or `kind:tenant:repo`.
    pub fn to_key(&self) -> String {
        match &self.repo {
            Some(repo) => format!("{}:{}:{}", self.kind, self.tenant, repo),
            None => format!("{}:{}", self.kind, self.tenant),
        }
    }

    /// Storage key with the repo scope stripped.
    ///
    /// Used by backends that only address secrets at the tenant level.
    pub fn tenant_key(&self) -> String {
        format!("{}:{}", self.kind, self.tenant)
    }

    /// Prefix matching every key of this kind for a tenant.
    pub fn kind_prefix(kind: SecretKind, tenant: &TenantId) -> String {
        format!("{}:{}", kind, tenant)
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_normalization() {
        let id = TenantId::new("ACME");
        assert_eq!(id.as_str(), "acme");
    }

    #[test]
    fn test_tenant_wide_key() {
        let key = SecretKey::tenant_wide(SecretKind::SessionToken, "acme");
        assert_eq!(key.to_key(), "session-token:acme");
        assert_eq!(key.tenant_key(), "session-token:acme");
    }

    #[test]
    fn test_repo_scoped_key() {
        let key = SecretKey::repo_scoped(SecretKind::SessionToken, "acme", "r1");
        assert_eq!(key.to_key(), "session-token:acme:r1");
        assert_eq!(key.tenant_key(), "session-token:acme");
    }

    #[test]
    fn test_kind_prefix_matches_scoped_and_unscoped() {
        let tenant = TenantId::new("acme");
        let prefix = SecretKey::kind_prefix(SecretKind::SessionToken, &tenant);
        let unscoped = SecretKey::tenant_wide(SecretKind::SessionToken, "acme");
        let scoped = SecretKey::repo_scoped(SecretKind::SessionToken, "acme", "r1");
        assert!(unscoped.to_key().starts_with(&prefix));
        assert!(scoped.to_key().starts_with(&prefix));
    }

    #[test]
    fn test_tenant_record_round_trip() {
        let record = TenantRecord {
            tenant_id: TenantId::new("acme"),
            name: "acme".to_string(),
            role: "admin".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let parsed: TenantRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
