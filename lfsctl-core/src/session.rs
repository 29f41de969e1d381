//! Session directory persistence.
//!
//! This module provides disk-backed storage for the non-secret session
//! state: the configured API endpoint, the currently selected tenant, and
//! the list of known tenants. The file is read fully at construction and
//! rewritten fully (write-temp-then-rename) on every mutating accessor, so
//! consumers never call an explicit save.
//!
//! # Storage Location
//!
//! State lives at `~/.config/lfsctl/session.json` on Linux/macOS and
//! `%APPDATA%\lfsctl\session.json` on Windows.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

use crate::model::{TenantId, TenantRecord};

/// Environment variable seeding the endpoint for a fresh session file.
const DEFAULT_ENDPOINT_VAR: &str = "LFSCTL_API_ENDPOINT";

/// Error type for session directory operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// I/O error reading or writing the session file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration directory not available.
    #[error("configuration directory not available")]
    ConfigDirUnavailable,

    /// Internal lock poisoning error.
    #[error("internal lock error: {message}")]
    LockError { message: String },
}

/// On-disk session file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionData {
    /// Version of the file format (for future migrations).
    version: u32,

    /// Base URL of the storage service API; empty when not configured.
    #[serde(default)]
    api_endpoint: String,

    /// Currently selected tenant, if any.
    #[serde(default)]
    current_tenant: Option<TenantId>,

    /// Known tenants, in first-seen order.
    #[serde(default)]
    tenants: Vec<TenantRecord>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            version: 1,
            api_endpoint: std::env::var(DEFAULT_ENDPOINT_VAR).unwrap_or_default(),
            current_tenant: None,
            tenants: Vec::new(),
        }
    }
}

/// Disk-backed session directory.
///
/// # Thread Safety
///
/// Uses interior mutability via `RwLock`; a single CLI invocation only ever
/// performs one operation, but the type is safe to share regardless.
pub struct SessionStore {
    /// Path to the session JSON file.
    path: PathBuf,

    /// In-memory copy of the session data.
    data: RwLock<SessionData>,
}

impl SessionStore {
    /// Get the default storage path for the session file.
    pub fn default_path() -> Result<PathBuf, SessionError> {
        let dirs = directories::ProjectDirs::from("com", "candy-storage", "lfsctl")
            .ok_or(SessionError::ConfigDirUnavailable)?;

        Ok(dirs.config_dir().join("session.json"))
    }

    /// Load the session directory from the default location.
    pub fn load() -> Result<Self, SessionError> {
        Self::load_from_path(Self::default_path()?)
    }

    /// Load the session directory from a specific path.
    ///
    /// An absent file yields defaults seeded from `LFSCTL_API_ENDPOINT`.
    pub fn load_from_path(path: PathBuf) -> Result<Self, SessionError> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            SessionData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Write the current state to disk atomically.
    fn save(&self) -> Result<(), SessionError> {
        let data = self.data.read().map_err(|e| SessionError::LockError {
            message: format!("read lock poisoned: {}", e),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&*data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Get the configured API endpoint; empty when not configured.
    pub fn api_endpoint(&self) -> Result<String, SessionError> {
        let data = self.read()?;
        Ok(data.api_endpoint.clone())
    }

    /// Set the API endpoint and persist.
    pub fn set_api_endpoint(&self, endpoint: impl Into<String>) -> Result<(), SessionError> {
        {
            let mut data = self.write()?;
            data.api_endpoint = endpoint.into();
        }
        self.save()
    }

    /// Get the currently selected tenant, if any.
    pub fn current_tenant(&self) -> Result<Option<TenantId>, SessionError> {
        let data = self.read()?;
        Ok(data.current_tenant.clone())
    }

    /// Set (or clear) the currently selected tenant and persist.
    pub fn set_current_tenant(&self, tenant: Option<TenantId>) -> Result<(), SessionError> {
        {
            let mut data = self.write()?;
            data.current_tenant = tenant;
        }
        self.save()
    }

    /// List all known tenant records.
    pub fn tenants(&self) -> Result<Vec<TenantRecord>, SessionError> {
        let data = self.read()?;
        Ok(data.tenants.clone())
    }

    /// Look up one tenant record by id.
    pub fn tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, SessionError> {
        let data = self.read()?;
        Ok(data
            .tenants
            .iter()
            .find(|t| &t.tenant_id == tenant_id)
            .cloned())
    }

    /// Insert or update a tenant record by id and persist.
    ///
    /// An existing record keeps its position; only name and role change.
    pub fn upsert_tenant(
        &self,
        tenant_id: TenantId,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Result<(), SessionError> {
        {
            let mut data = self.write()?;
            let name = name.into();
            let role = role.into();
            match data.tenants.iter_mut().find(|t| t.tenant_id == tenant_id) {
                Some(record) => {
                    record.name = name;
                    record.role = role;
                }
                None => data.tenants.push(TenantRecord {
                    tenant_id,
                    name,
                    role,
                }),
            }
        }
        self.save()
    }

    /// Remove a tenant record by id and persist.
    ///
    /// Clears `current_tenant` in the same write when it pointed at the
    /// removed id. Removing an unknown tenant is not an error.
    pub fn remove_tenant(&self, tenant_id: &TenantId) -> Result<(), SessionError> {
        {
            let mut data = self.write()?;
            data.tenants.retain(|t| &t.tenant_id != tenant_id);
            if data.current_tenant.as_ref() == Some(tenant_id) {
                data.current_tenant = None;
            }
        }
        self.save()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, SessionData>, SessionError> {
        self.data.read().map_err(|e| SessionError::LockError {
            message: format!("read lock poisoned: {}", e),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SessionData>, SessionError> {
        self.data.write().map_err(|e| SessionError::LockError {
            message: format!("write lock poisoned: {}", e),
        })
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("path", &self.path)
            .finish()
    }
}
