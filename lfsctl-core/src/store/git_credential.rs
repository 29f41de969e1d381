//! git-credential-helper secret storage implementation.
//!
//! Secrets are handed to whatever credential helper the user's git
//! configuration selects, via `git credential fill|approve|reject` and the
//! line-oriented `key=value` protocol. One credential is addressed per
//! tenant: the host comes from the configured API endpoint, the path is the
//! endpoint base path joined with the tenant id, and the username is the
//! tenant id. Kind and repo scope do not appear in the helper key, so they
//! collapse to the tenant-level credential.
//!
//! Helper unavailability must never crash the caller: every subprocess
//! failure (missing git, non-zero exit, timeout, unparseable output) is
//! swallowed and reported as "no secret" / best-effort write.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use url::Url;

use crate::model::{SecretKey, TenantId};

use super::{Secret, SecretStore, StoreError};

/// Host used when no API endpoint is configured yet.
const PLACEHOLDER_HOST: &str = "lfs.invalid";

/// How long a helper subprocess may run before being abandoned.
const HELPER_TIMEOUT: Duration = Duration::from_secs(3);

/// Secret store backed by the git credential helper protocol.
pub struct GitCredentialStore {
    endpoint: Option<String>,
}

impl GitCredentialStore {
    /// Create a store deriving credential host/path from the given endpoint.
    ///
    /// `endpoint` is the configured API endpoint URL; `None` (or an
    /// unparseable value) falls back to a fixed placeholder host.
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint }
    }

    /// Build the `key=value` descriptor lines addressing a tenant's credential.
    fn descriptor(&self, tenant: &TenantId) -> Vec<(String, String)> {
        let (host, base_path) = self
            .endpoint
            .as_deref()
            .and_then(|e| Url::parse(e).ok())
            .and_then(|url| {
                let host = url.host_str()?.to_string();
                let base = url.path().trim_matches('/').to_string();
                Some((host, base))
            })
            .unwrap_or_else(|| (PLACEHOLDER_HOST.to_string(), String::new()));

        let path = if base_path.is_empty() {
            tenant.to_string()
        } else {
            format!("{}/{}", base_path, tenant)
        };

        vec![
            ("protocol".to_string(), "https".to_string()),
            ("host".to_string(), host),
            ("path".to_string(), path),
            ("username".to_string(), tenant.to_string()),
        ]
    }

    /// Run `git credential <op>` feeding the descriptor on stdin.
    ///
    /// Returns the parsed `key=value` output lines, or `None` on any failure.
    async fn run_helper(
        &self,
        op: &str,
        lines: &[(String, String)],
    ) -> Option<Vec<(String, String)>> {
        let mut child = Command::new("git")
            .arg("credential")
            .arg(op)
            // Never let a helperless configuration fall back to an
            // interactive terminal prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .ok()?;

        let mut input = String::new();
        for (key, value) in lines {
            input.push_str(key);
            input.push('=');
            input.push_str(value);
            input.push('\n');
        }
        input.push('\n');

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await.ok()?;
            // Dropping stdin closes the pipe so the helper sees EOF.
        }

        let output = match tokio::time::timeout(HELPER_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!("git credential {} failed to run: {}", op, e);
                return None;
            }
            Err(_) => {
                tracing::debug!("git credential {} timed out", op);
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!("git credential {} exited with {}", op, output.status);
            return None;
        }

        let stdout = String::from_utf8(output.stdout).ok()?;
        Some(
            stdout
                .lines()
                .filter_map(|line| {
                    let (key, value) = line.split_once('=')?;
                    Some((key.to_string(), value.to_string()))
                })
                .collect(),
        )
    }
}

impl std::fmt::Debug for GitCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCredentialStore")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl SecretStore for GitCredentialStore {
    async fn get(&self, key: &SecretKey) -> Result<Option<Secret>, StoreError> {
        let descriptor = self.descriptor(&key.tenant);
        let Some(fields) = self.run_helper("fill", &descriptor).await else {
            return Ok(None);
        };

        Ok(fields
            .into_iter()
            .find(|(k, _)| k == "password")
            .map(|(_, v)| Secret::new(v)))
    }

    async fn set(&self, key: &SecretKey, secret: &Secret) -> Result<(), StoreError> {
        let mut descriptor = self.descriptor(&key.tenant);
        descriptor.push(("password".to_string(), secret.expose().to_string()));
        // Best-effort write; a missing or failing helper is not an error.
        let _ = self.run_helper("approve", &descriptor).await;
        Ok(())
    }

    async fn delete(&self, key: &SecretKey) -> Result<(), StoreError> {
        let descriptor = self.descriptor(&key.tenant);
        let _ = self.run_helper("reject", &descriptor).await;
        Ok(())
    }

    async fn purge_tenant(&self, tenant: &TenantId) -> Result<(), StoreError> {
        // The helper addresses one credential per tenant, so a single
        // reject scrubs everything this backend holds for it.
        let descriptor = self.descriptor(tenant);
        let _ = self.run_helper("reject", &descriptor).await;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::BackendError {
            message: format!(
                "list_keys not supported by credential helper backend (requested prefix: {})",
                prefix
            ),
        })
    }
}
