//! HTTP transport and error normalization.
//!
//! [`ApiClient`] performs bearer-authorized JSON calls against the storage
//! service; every failed exchange (non-2xx response or transport failure)
//! is turned into exactly one [`ApiError`] carrying a status code, a human
//! message, and the structured body that produced it.

use reqwest::Method;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::store::Secret;

/// Fixed timeout for every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalized error for a failed API exchange.
///
/// `status` is the HTTP status code, or `0` for a transport-level failure
/// (DNS, connection, timeout). `details` holds the parsed JSON error body
/// when one was present.
#[derive(Debug, Clone, Error)]
#[error("API error {status}: {message}")]
pub struct ApiError {
    /// HTTP status code; 0 means no response was obtained.
    pub status: u16,

    /// Human-readable message extracted from the response.
    pub message: String,

    /// Parsed JSON error body, empty when the body was not a JSON object.
    pub details: Map<String, Value>,
}

impl ApiError {
    /// Normalize a transport-level failure (no response obtained).
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self {
            status: 0,
            message: format!("Network error: {}", err),
            details: Map::new(),
        }
    }

    /// Normalize a non-2xx response from its status and raw body text.
    ///
    /// Layered parse, in priority order: OAuth-style `{error,
    /// error_description}`, bare `{error}`, management-style `{error |
    /// message, details: [..]}` with non-empty detail items appended, and
    /// finally the raw body text when it is not a JSON object. Malformed
    /// JSON never aborts; it falls through to the raw-text case.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Map<String, Value>> = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            });

        let Some(map) = parsed else {
            return Self {
                status,
                message: body.to_string(),
                details: Map::new(),
            };
        };

        let message = if map.contains_key("error") && map.contains_key("error_description") {
            stringify(&map["error_description"])
        } else if let Some(error) = map.get("error") {
            stringify(error)
        } else {
            let mut message = map
                .get("message")
                .map(stringify)
                .unwrap_or_else(|| body.to_string());

            if let Some(Value::Array(items)) = map.get("details") {
                let joined = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(stringify)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                if !joined.is_empty() {
                    message = format!("{}: {}", message, joined);
                }
            }
            message
        };

        Self {
            status,
            message,
            details: map,
        }
    }

    /// Value of `details.error`, when present as a string.
    pub fn error_code(&self) -> Option<&str> {
        self.details.get("error").and_then(Value::as_str)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bearer-authorized JSON client for the storage service API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<Secret>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create an unauthenticated client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    /// Create a client sending `Authorization: Bearer <token>` on every call.
    pub fn with_token(base_url: impl Into<String>, token: Secret) -> Self {
        Self {
            base_url: base_url.into(),
            token: Some(token),
            http: reqwest::Client::new(),
        }
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request and return the parsed JSON body.
    ///
    /// A 204 response is success with no content (`Value::Null`), regardless
    /// of method. Non-2xx responses and transport failures become
    /// [`ApiError`] values.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        json: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);

        let mut request = self
            .http
            .request(method, &url)
            .timeout(REQUEST_TIMEOUT);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }
        if let Some(body) = json {
            request = request.json(body);
        }
        if let Some(params) = query {
            request = request.query(params);
        }

        let response = request.send().await.map_err(ApiError::network)?;
        Self::decode(response).await
    }

    /// Revoke a token server-side.
    ///
    /// The bearer header carries the token under revocation, not this
    /// client's own token. 204 on success.
    pub async fn revoke_token(&self, token: &Secret) -> Result<(), ApiError> {
        let url = self.url("/auth/token/revoke");

        let response = self
            .http
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(ApiError::network)?;

        Self::decode(response).await.map(|_| ())
    }

    // Management surface: plain pass-throughs over `request`.

    /// Fetch info about the authorized tenant.
    pub async fn tenant_info(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/tenant", None, None).await
    }

    /// List repositories in the tenant.
    pub async fn list_repos(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/repos", None, None).await
    }

    /// Create a repository.
    pub async fn create_repo(&self, name: &str) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "name": name });
        self.request(Method::POST, "/repos", Some(&body), None).await
    }

    /// Delete a repository.
    pub async fn delete_repo(&self, name: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, &format!("/repos/{}", name), None, None)
            .await
    }

    /// List issued tokens.
    pub async fn list_tokens(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/tokens", None, None).await
    }

    /// Create a token, optionally scoped to one repository.
    pub async fn create_token(&self, repo: Option<&str>) -> Result<Value, ApiError> {
        let body = match repo {
            Some(repo) => serde_json::json!({ "repo_name": repo }),
            None => serde_json::json!({}),
        };
        self.request(Method::POST, "/tokens", Some(&body), None).await
    }

    /// Revoke an issued token by id.
    pub async fn delete_token(&self, token_id: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, &format!("/tokens/{}", token_id), None, None)
            .await
    }

    /// Fetch the tenant usage summary.
    pub async fn usage(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/usage", None, None).await
    }

    /// Join the base URL and a path with exactly one slash.
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();

        if status.as_u16() == 204 {
            return Ok(Value::Null);
        }

        let body = response.text().await.map_err(ApiError::network)?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError {
            status: status.as_u16(),
            message: format!("invalid JSON in response: {}", e),
            details: Map::new(),
        })
    }
}
