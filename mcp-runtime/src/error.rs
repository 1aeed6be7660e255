use directus_mcp_core::error::{ErrorSummary, codes};

use crate::backend::BackendError;

/// Per-request failure of a tool call or prompt lookup.
///
/// These never cross the dispatch boundary as faults: the dispatcher turns
/// every one of them into an error envelope so the agent can adapt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Collection \"{0}\" not found. Call read-collections first to see the available collections.")]
    CollectionNotFound(String),

    #[error(transparent)]
    BackendRequestFailed(#[from] BackendError),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Prompts collection is misconfigured: {0}")]
    PromptsCollectionMisconfigured(String),

    #[error("{0}")]
    Rejected(String),
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => codes::UNKNOWN_TOOL,
            ToolError::InvalidArguments(_) => codes::INVALID_ARGUMENTS,
            ToolError::CollectionNotFound(_) => codes::COLLECTION_NOT_FOUND,
            ToolError::BackendRequestFailed(_) => codes::BACKEND_REQUEST_FAILED,
            ToolError::PromptNotFound(_) => codes::PROMPT_NOT_FOUND,
            ToolError::PromptsCollectionMisconfigured(_) => codes::PROMPTS_COLLECTION_MISCONFIGURED,
            ToolError::Rejected(_) => codes::REJECTED,
        }
    }

    /// Reduce the error to the `{error, code?}` payload shown to the agent.
    ///
    /// A structured error list from the backend wins: its first entry's
    /// message and machine code are reported verbatim. Every other failure
    /// reports its own message and kind code.
    pub fn classify(&self) -> ErrorSummary {
        match self {
            ToolError::BackendRequestFailed(BackendError::Api { errors, .. }) => {
                match errors.first() {
                    Some(first) => {
                        let message = if first.message.is_empty() {
                            "Unknown error".to_string()
                        } else {
                            first.message.clone()
                        };
                        let summary = ErrorSummary::new(message);
                        match first.code() {
                            Some(code) => summary.with_code(code),
                            None => summary,
                        }
                    }
                    None => ErrorSummary::new(self.to_string()).with_code(self.code()),
                }
            }
            other => ErrorSummary::new(other.to_string()).with_code(other.code()),
        }
    }
}

/// Summary for a handler that panicked instead of returning an error.
pub fn classify_panic(payload: &(dyn std::any::Any + Send)) -> ErrorSummary {
    let message = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Tool handler failed unexpectedly".to_string()
    };
    ErrorSummary::new(message)
}

/// Failures that stop the process before it can serve requests.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}")]
    ConfigInvalid(String),

    #[error("Authentication against the backend failed: {0}")]
    AuthenticationFailed(String),

    #[error("Failed to fetch the backend schema: {0}")]
    SchemaFetchFailed(String),

    #[error("Tool '{0}' is registered more than once")]
    DuplicateTool(String),
}

impl StartupError {
    pub fn code(&self) -> &'static str {
        match self {
            StartupError::ConfigInvalid(_) => codes::CONFIG_INVALID,
            StartupError::AuthenticationFailed(_) => codes::AUTHENTICATION_FAILED,
            StartupError::SchemaFetchFailed(_) => codes::SCHEMA_FETCH_FAILED,
            StartupError::DuplicateTool(_) => codes::DUPLICATE_TOOL,
        }
    }
}
