//! # lfsctl Core
//!
//! Core library for the lfsctl storage-service client.
//!
//! This crate provides:
//! - Domain types for tenants and secret-store keys
//! - The secret storage abstraction with OS-vault, git-credential-helper,
//!   and in-memory backends
//! - The persisted session directory (endpoint, current tenant, tenant list)
//! - The HTTP transport with normalized errors
//! - The device authentication flow and the credential coordinator

pub mod api;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod model;
pub mod session;
pub mod store;

// Re-export commonly used types at crate root
pub use model::{SecretKey, SecretKind, TenantId, TenantRecord};

pub use store::{create_store, GitCredentialStore, MemoryStore, Secret, SecretStore, StoreError};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use api::{ApiClient, ApiError};

pub use session::{SessionError, SessionStore};

pub use device::{AuthGrant, DeviceFlow, DeviceHandshake, Sleeper, TokioSleeper};

pub use coordinator::Coordinator;

pub use error::Error;
