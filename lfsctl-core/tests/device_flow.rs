//! Integration tests for the device authentication flow.
//!
//! A scripted provider drives the poll loop through pending and slow-down
//! signals; a recording sleeper observes the intervals without real delays.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lfsctl_core::api::ApiClient;
use lfsctl_core::device::{DeviceFlow, DeviceHandshake, Sleeper};
use lfsctl_core::model::TenantId;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sleeper that records requested durations instead of waiting.
#[derive(Clone, Default)]
struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    fn durations(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

fn handshake(interval: u64) -> DeviceHandshake {
    serde_json::from_value(serde_json::json!({
        "device_code": "D1",
        "user_code": "ABCD-1234",
        "verification_uri": "https://github.com/login/device",
        "interval": interval,
    }))
    .unwrap()
}

fn pending_response() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(serde_json::json!({
        "error": "authorization_pending",
        "error_description": "user has not approved yet",
    }))
}

fn slow_down_response() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(serde_json::json!({
        "error": "slow_down",
        "error_description": "polling too fast",
    }))
}

fn success_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "token": "tok_1",
        "identity_username": "alice",
        "permission": "admin",
        "repo_names": ["r1", "r2"],
    }))
}

#[tokio::test]
async fn test_request_device_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/github/device"))
        .and(body_string_contains("\"tenant_id\":\"acme\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "D1",
            "user_code": "ABCD-1234",
            "verification_uri": "https://github.com/login/device",
            "interval": 5,
            "expires_in": 900,
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let flow = DeviceFlow::new(&client);
    let handshake = flow
        .request_device_code(&TenantId::new("acme"))
        .await
        .unwrap();

    assert_eq!(handshake.device_code, "D1");
    assert_eq!(handshake.user_code, "ABCD-1234");
    assert_eq!(handshake.interval, 5);
}

#[tokio::test]
async fn test_pending_three_times_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(pending_response())
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(success_response())
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let sleeper = RecordingSleeper::default();
    let flow = DeviceFlow::with_sleeper(&client, sleeper.clone());

    let grant = flow
        .wait_for_authorization(&TenantId::new("acme"), &handshake(5))
        .await
        .unwrap();

    assert_eq!(grant.token, "tok_1");
    assert_eq!(grant.identity_username, "alice");
    assert_eq!(
        sleeper.durations(),
        vec![
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ]
    );
}

#[tokio::test]
async fn test_slow_down_increment_persists_across_pending() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(slow_down_response())
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(pending_response())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(success_response())
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let sleeper = RecordingSleeper::default();
    let flow = DeviceFlow::with_sleeper(&client, sleeper.clone());

    let grant = flow
        .wait_for_authorization(&TenantId::new("acme"), &handshake(5))
        .await
        .unwrap();

    assert_eq!(grant.token, "tok_1");
    assert_eq!(
        sleeper.durations(),
        vec![
            Duration::from_secs(5),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ]
    );
}

#[tokio::test]
async fn test_access_denied_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "access_denied",
            "error_description": "user denied the request",
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let sleeper = RecordingSleeper::default();
    let flow = DeviceFlow::with_sleeper(&client, sleeper.clone());

    let err = flow
        .wait_for_authorization(&TenantId::new("acme"), &handshake(5))
        .await
        .unwrap_err();

    assert_eq!(err.status, 400);
    assert_eq!(err.message, "user denied the request");
    assert!(sleeper.durations().is_empty());
}

#[tokio::test]
async fn test_server_error_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/github/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri());
    let sleeper = RecordingSleeper::default();
    let flow = DeviceFlow::with_sleeper(&client, sleeper.clone());

    let err = flow
        .wait_for_authorization(&TenantId::new("acme"), &handshake(5))
        .await
        .unwrap_err();

    assert_eq!(err.status, 500);
    assert_eq!(err.message, "boom");
}
