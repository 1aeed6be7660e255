//! Client for the Directus REST API.
//!
//! Tool handlers talk to the backend through the [`Backend`] trait so they
//! can be exercised against an in-memory stub. [`HttpBackend`] is the
//! production implementation on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use directus_mcp_core::error::{ApiErrorEntry, BackendErrorBody};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use url::Url;

use crate::endpoints;

const ERROR_BODY_PREVIEW_CHARS: usize = 500;

/// One REST call: method, path segments below the base URL, query pairs
/// and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl BackendRequest {
    pub fn new(method: Method, segments: Vec<String>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(segments: Vec<String>) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn post(segments: Vec<String>, body: Value) -> Self {
        Self::new(Method::POST, segments).with_body(body)
    }

    pub fn patch(segments: Vec<String>, body: Value) -> Self {
        Self::new(Method::PATCH, segments).with_body(body)
    }

    pub fn delete(segments: Vec<String>) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub fn with_query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Display form of the path, e.g. `/items/posts/1`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Raw bytes of a stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// The backend answered with its structured `{"errors": [...]}` list.
    #[error("Backend returned HTTP {status}: {}", summarize_errors(.errors))]
    Api {
        status: u16,
        errors: Vec<ApiErrorEntry>,
    },

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to reach backend: {0}")]
    Transport(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

fn summarize_errors(errors: &[ApiErrorEntry]) -> String {
    errors
        .iter()
        .map(|entry| match entry.code() {
            Some(code) => format!("{} ({code})", entry.message),
            None => entry.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Perform a request and return the `data` member of the response.
    async fn request(&self, request: BackendRequest) -> Result<Value, BackendError>;

    /// Download the binary content of a file.
    async fn fetch_asset(&self, id: &str) -> Result<Asset, BackendError>;
}

pub struct HttpBackend {
    base_url: Url,
    http: reqwest::Client,
    token: String,
}

impl HttpBackend {
    pub fn with_token(
        base_url: Url,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            base_url,
            http: build_client(timeout)?,
            token: token.into(),
        })
    }

    /// Exchange email and password for an access token. The token is kept
    /// for the lifetime of the process and never refreshed.
    pub async fn login(
        base_url: Url,
        email: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = build_client(timeout)?;
        let url = endpoint_url(&base_url, &endpoints::auth_login(), &[])?;
        let response = http
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let data = read_response(response).await?;
        let token = data
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::Decode("login response has no access_token".to_string()))?
            .to_string();
        tracing::info!(email, "authenticated with email and password");
        Ok(Self {
            base_url,
            http,
            token,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn request(&self, request: BackendRequest) -> Result<Value, BackendError> {
        let url = endpoint_url(&self.base_url, &request.segments, &request.query)?;
        tracing::debug!(method = %request.method, path = %request.path(), "backend request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        read_response(response).await
    }

    async fn fetch_asset(&self, id: &str) -> Result<Asset, BackendError> {
        let url = endpoint_url(&self.base_url, &endpoints::asset(id), &[])?;
        tracing::debug!(id, "backend asset download");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(read_response(response)
                .await
                .err()
                .unwrap_or(BackendError::Http {
                    status: status.as_u16(),
                    body: String::new(),
                }));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(format!("failed to read asset body: {e}")))?;
        Ok(Asset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))
}

fn endpoint_url(
    base: &Url,
    segments: &[String],
    query: &[(String, String)],
) -> Result<Url, BackendError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BackendError::Transport(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

async fn read_response(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BackendError::Transport(format!("failed to read response body: {e}")))?;

    if status.is_success() {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        return Ok(unwrap_data(body));
    }

    if let Ok(body) = serde_json::from_slice::<Value>(&bytes) {
        if let Some(parsed) = BackendErrorBody::from_value(&body) {
            return Err(BackendError::Api {
                status: status.as_u16(),
                errors: parsed.errors,
            });
        }
    }
    let text: String = String::from_utf8_lossy(&bytes)
        .chars()
        .take(ERROR_BODY_PREVIEW_CHARS)
        .collect();
    Err(BackendError::Http {
        status: status.as_u16(),
        body: text,
    })
}

/// Strip the `{"data": ...}` wrapper. When the backend also sent `meta`
/// (count queries) both members are kept.
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            if map.len() == 1 {
                map.remove("data").unwrap_or(Value::Null)
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
