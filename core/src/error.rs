use serde::{Deserialize, Serialize};

/// One entry of the backend's structured error list.
///
/// Directus reports failures as `{"errors": [{"message": ..., "extensions": {"code": ...}}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ApiErrorExtensions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorExtensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiErrorEntry {
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }
}

/// Error body as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendErrorBody {
    pub errors: Vec<ApiErrorEntry>,
}

impl BackendErrorBody {
    /// Parse a response body into a structured error list. Returns `None`
    /// when the body is not the backend's error shape or the list is empty.
    pub fn from_value(body: &serde_json::Value) -> Option<Self> {
        let parsed: Self = serde_json::from_value(body.clone()).ok()?;
        if parsed.errors.is_empty() {
            return None;
        }
        Some(parsed)
    }
}

/// Error payload written into an error envelope. Agents read `error` and
/// branch on `code` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorSummary {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Error codes used across the server
pub mod codes {
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
    pub const COLLECTION_NOT_FOUND: &str = "collection_not_found";
    pub const BACKEND_REQUEST_FAILED: &str = "backend_request_failed";
    pub const PROMPT_NOT_FOUND: &str = "prompt_not_found";
    pub const PROMPTS_COLLECTION_MISCONFIGURED: &str = "prompts_collection_misconfigured";
    pub const REJECTED: &str = "rejected";
    pub const CONFIG_INVALID: &str = "config_invalid";
    pub const AUTHENTICATION_FAILED: &str = "authentication_failed";
    pub const SCHEMA_FETCH_FAILED: &str = "schema_fetch_failed";
    pub const DUPLICATE_TOOL: &str = "duplicate_tool";
}
