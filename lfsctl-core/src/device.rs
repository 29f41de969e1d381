//! Device authentication flow.
//!
//! The CLI authenticates against the storage service with a GitHub device
//! flow: one request exchanges a tenant id for a handshake (device code,
//! user code, verification URI), the user approves out-of-band in a
//! browser, and the client polls the token endpoint until the provider
//! reports a terminal outcome.
//!
//! The poll loop runs in the foreground with a cooperative sleep between
//! attempts. `authorization_pending` and `slow_down` are normal control
//! signals consumed here, never surfaced as errors; anything else ends the
//! flow. No attempt cap or deadline is enforced locally; callers make the
//! wait cancellable (the CLI races it against Ctrl-C).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::api::{ApiClient, ApiError};
use crate::model::TenantId;

/// Fixed interval increase applied after a `slow_down` signal.
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Handshake returned by the device-code request.
///
/// Ephemeral, scoped to one login invocation, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceHandshake {
    /// The device verification code (keep this secret).
    pub device_code: String,

    /// The code the user enters at the verification URI.
    pub user_code: String,

    /// Where the user approves the login.
    pub verification_uri: String,

    /// Initial interval in seconds between polling requests.
    pub interval: u64,
}

/// Payload returned once the user has authorized.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    /// Session token issued by the storage service.
    pub token: String,

    /// GitHub username of the authorized identity.
    pub identity_username: String,

    /// Permission level granted within the tenant.
    pub permission: String,

    /// Repositories the token is scoped to; `None` means tenant-wide.
    #[serde(default)]
    pub repo_names: Option<Vec<String>>,
}

/// Cooperative sleep used between poll attempts.
///
/// Injectable so tests can observe intervals without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives the device authorization flow against one provider endpoint pair.
pub struct DeviceFlow<'a, S: Sleeper = TokioSleeper> {
    client: &'a ApiClient,
    sleeper: S,
}

impl<'a> DeviceFlow<'a> {
    /// Create a flow with the production sleeper.
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            sleeper: TokioSleeper,
        }
    }
}

impl<'a, S: Sleeper> DeviceFlow<'a, S> {
    /// Create a flow with an injected sleeper.
    pub fn with_sleeper(client: &'a ApiClient, sleeper: S) -> Self {
        Self { client, sleeper }
    }

    /// Exchange a tenant id for a device handshake.
    pub async fn request_device_code(
        &self,
        tenant: &TenantId,
    ) -> Result<DeviceHandshake, ApiError> {
        let body = serde_json::json!({ "tenant_id": tenant.as_str() });
        let value = self
            .client
            .request(reqwest::Method::POST, "/auth/github/device", Some(&body), None)
            .await?;

        serde_json::from_value(value).map_err(|e| ApiError {
            status: 200,
            message: format!("invalid device handshake: {}", e),
            details: serde_json::Map::new(),
        })
    }

    /// Poll until the provider reports a terminal outcome.
    ///
    /// `authorization_pending` sleeps the current interval and retries;
    /// `slow_down` sleeps the current interval, then raises the interval to
    /// the handshake interval plus five seconds for all subsequent polls.
    /// Any other error is propagated and ends the flow.
    pub async fn wait_for_authorization(
        &self,
        tenant: &TenantId,
        handshake: &DeviceHandshake,
    ) -> Result<AuthGrant, ApiError> {
        let initial = Duration::from_secs(handshake.interval);
        let mut interval = initial;

        loop {
            match self.poll_token(tenant, &handshake.device_code).await {
                Ok(grant) => return Ok(grant),
                Err(err) => match poll_signal(&err) {
                    Some(PollSignal::Pending) => {
                        tracing::debug!(tenant = %tenant, "authorization pending");
                        self.sleeper.sleep(interval).await;
                    }
                    Some(PollSignal::SlowDown) => {
                        tracing::debug!(tenant = %tenant, "provider asked to slow down");
                        self.sleeper.sleep(interval).await;
                        interval = initial + SLOW_DOWN_INCREMENT;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    async fn poll_token(
        &self,
        tenant: &TenantId,
        device_code: &str,
    ) -> Result<AuthGrant, ApiError> {
        let body = serde_json::json!({
            "tenant_id": tenant.as_str(),
            "device_code": device_code,
        });
        let value = self
            .client
            .request(reqwest::Method::POST, "/auth/github/token", Some(&body), None)
            .await?;

        serde_json::from_value(value).map_err(|e| ApiError {
            status: 200,
            message: format!("invalid token payload: {}", e),
            details: serde_json::Map::new(),
        })
    }
}

/// Non-terminal provider signals during polling.
enum PollSignal {
    Pending,
    SlowDown,
}

fn poll_signal(err: &ApiError) -> Option<PollSignal> {
    if !(400..500).contains(&err.status) {
        return None;
    }
    match err.error_code() {
        Some("authorization_pending") => Some(PollSignal::Pending),
        Some("slow_down") => Some(PollSignal::SlowDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_error() -> ApiError {
        ApiError::from_response(400, r#"{"error": "authorization_pending"}"#)
    }

    #[test]
    fn test_pending_signal_recognized() {
        assert!(matches!(
            poll_signal(&pending_error()),
            Some(PollSignal::Pending)
        ));
    }

    #[test]
    fn test_slow_down_signal_recognized() {
        let err = ApiError::from_response(400, r#"{"error": "slow_down"}"#);
        assert!(matches!(poll_signal(&err), Some(PollSignal::SlowDown)));
    }

    #[test]
    fn test_other_400_is_terminal() {
        let err = ApiError::from_response(400, r#"{"error": "access_denied"}"#);
        assert!(poll_signal(&err).is_none());
    }

    #[test]
    fn test_network_failure_is_terminal() {
        let err = ApiError::network("connection reset");
        assert!(poll_signal(&err).is_none());
    }

    #[test]
    fn test_non_400_is_terminal_even_when_pending_shaped() {
        let err = ApiError::from_response(500, r#"{"error": "authorization_pending"}"#);
        assert!(poll_signal(&err).is_none());
    }
}
