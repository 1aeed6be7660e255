use std::sync::Arc;

use serde_json::Value;

use crate::backend::{Backend, HttpBackend};
use crate::config::{Credentials, ServerConfig};
use crate::error::StartupError;

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag, everything else
/// disables it.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}

/// Tool names from a comma separated list or a JSON-style array
/// (`["delete-item", "update-field"]`).
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(names) = serde_json::from_str::<Vec<String>>(trimmed) {
            return names
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
        }
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|name| name.trim().trim_matches(['"', '\'']).trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Build an authenticated backend client for the configured credential mode.
pub async fn connect(config: &ServerConfig) -> Result<Arc<dyn Backend>, StartupError> {
    let backend = match &config.credentials {
        Credentials::Token(token) => {
            HttpBackend::with_token(config.base_url.clone(), token.clone(), config.request_timeout)
        }
        Credentials::Login { email, password } => {
            HttpBackend::login(
                config.base_url.clone(),
                email,
                password,
                config.request_timeout,
            )
            .await
        }
    }
    .map_err(|e| StartupError::AuthenticationFailed(e.to_string()))?;
    Ok(Arc::new(backend))
}
