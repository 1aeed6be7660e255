//! Uniform result shape returned for every tool call.
//!
//! Success and error results share the same content-block layout and only
//! differ by `isError`, so a caller that ignores the flag still receives
//! parseable text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use directus_mcp_core::error::ErrorSummary;
use serde_json::{Value, json};

use crate::util::to_pretty_json;

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceContent {
    /// Base64 encoded bytes with their original size.
    Blob { base64: String, size: usize },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Success {
        text: String,
    },
    Error {
        summary: ErrorSummary,
    },
    Resource {
        uri: String,
        mime_type: String,
        content: ResourceContent,
    },
}

impl ResponseEnvelope {
    /// Pretty JSON of `data`. With a `message`, data and message are wrapped
    /// in `<data>` and `<message>` sections so the agent can tell payload and
    /// narration apart.
    pub fn success(data: &Value, message: Option<&str>) -> Self {
        let payload = to_pretty_json(data);
        let text = match message {
            Some(message) => {
                format!("<data>\n{payload}\n</data>\n<message>\n{message}\n</message>")
            }
            None => payload,
        };
        ResponseEnvelope::Success { text }
    }

    /// Plain text result, passed through untouched.
    pub fn text(text: impl Into<String>) -> Self {
        ResponseEnvelope::Success { text: text.into() }
    }

    pub fn error(summary: ErrorSummary) -> Self {
        ResponseEnvelope::Error { summary }
    }

    pub fn binary_resource(uri: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        ResponseEnvelope::Resource {
            uri: uri.into(),
            mime_type: mime_type.into(),
            content: ResourceContent::Blob {
                base64: STANDARD.encode(bytes),
                size: bytes.len(),
            },
        }
    }

    pub fn text_resource(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        ResponseEnvelope::Resource {
            uri: uri.into(),
            mime_type: mime_type.into(),
            content: ResourceContent::Text(text.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseEnvelope::Error { .. })
    }

    /// The `tools/call` result object.
    pub fn to_value(&self) -> Value {
        match self {
            ResponseEnvelope::Success { text } => json!({
                "content": [{ "type": "text", "text": text }]
            }),
            ResponseEnvelope::Error { summary } => {
                let text = serde_json::to_string(summary)
                    .unwrap_or_else(|_| json!({ "error": summary.error }).to_string());
                json!({
                    "isError": true,
                    "content": [{ "type": "text", "text": text }]
                })
            }
            ResponseEnvelope::Resource {
                uri,
                mime_type,
                content,
            } => {
                let mut resource = json!({
                    "uri": uri,
                    "mimeType": mime_type,
                });
                match content {
                    ResourceContent::Blob { base64, size } => {
                        resource["blob"] = Value::String(base64.clone());
                        resource["size"] = json!(size);
                    }
                    ResourceContent::Text(text) => {
                        resource["text"] = Value::String(text.clone());
                    }
                }
                json!({
                    "content": [{ "type": "resource", "resource": resource }]
                })
            }
        }
    }
}
