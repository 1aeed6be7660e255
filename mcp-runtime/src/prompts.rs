//! Prompt templates stored in a backend collection.
//!
//! Each row of the configured collection is one prompt: a name, an optional
//! description, an optional system prompt and a list of `{role, text}`
//! messages. `{{variable}}` placeholders in any of the texts become optional
//! prompt arguments.

use std::sync::Arc;

use directus_mcp_core::template::{extract_variables, substitute};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::error::ToolError;
use crate::query::ItemQuery;

const SYSTEM_PROMPT_ROLE: &str = "assistant";
const DEFAULT_ROLE: &str = "user";
const STATUS_FIELD: &str = "status";

/// Where prompts live and which fields hold their parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSettings {
    pub collection: String,
    pub name_field: String,
    pub description_field: String,
    pub system_prompt_field: String,
    pub messages_field: String,
    /// Only rows whose `status` equals this value are served.
    pub status_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Entry of the `prompts/list` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSummary {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: TextContent,
}

impl PromptMessage {
    fn new(role: impl Into<String>, text: String) -> Self {
        Self {
            role: role.into(),
            content: TextContent { kind: "text", text },
        }
    }
}

/// One row of the prompts collection, read through the configured field names.
#[derive(Debug, Clone, PartialEq)]
struct PromptRow {
    name: String,
    description: Option<String>,
    system_prompt: Option<String>,
    messages: Vec<TemplateMessage>,
}

#[derive(Debug, Clone, PartialEq)]
struct TemplateMessage {
    role: String,
    text: String,
}

impl PromptRow {
    fn from_value(row: &Value, settings: &PromptSettings) -> Option<Self> {
        let name = non_empty_str(row.get(&settings.name_field))?;
        Some(Self {
            name,
            description: non_empty_str(row.get(&settings.description_field)),
            system_prompt: non_empty_str(row.get(&settings.system_prompt_field)),
            messages: parse_messages(row.get(&settings.messages_field)),
        })
    }

    fn has_text(&self) -> bool {
        self.system_prompt.is_some() || self.messages.iter().any(|m| !m.text.is_empty())
    }

    fn texts(&self) -> impl Iterator<Item = &str> {
        self.system_prompt
            .as_deref()
            .into_iter()
            .chain(self.messages.iter().map(|m| m.text.as_str()))
    }

    fn summary(&self) -> PromptSummary {
        let arguments = extract_variables(self.texts())
            .into_iter()
            .map(|name| PromptArgument {
                description: format!("Value for {name}"),
                name,
                required: false,
            })
            .collect();
        PromptSummary {
            name: self.name.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| format!("Prompt: {}", self.name)),
            arguments,
        }
    }

    fn render(&self, args: &Map<String, Value>) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system_prompt) = &self.system_prompt {
            messages.push(PromptMessage::new(
                SYSTEM_PROMPT_ROLE,
                substitute(system_prompt, args),
            ));
        }
        for message in &self.messages {
            messages.push(PromptMessage::new(
                message.role.clone(),
                substitute(&message.text, args),
            ));
        }
        messages
    }
}

/// The messages field may hold an array or a JSON string encoding one.
fn parse_messages(value: Option<&Value>) -> Vec<TemplateMessage> {
    let parsed;
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(Value::String(encoded)) => {
            parsed = serde_json::from_str::<Value>(encoded).unwrap_or(Value::Null);
            match &parsed {
                Value::Array(items) => items,
                _ => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| {
            let text = item.get("text").and_then(Value::as_str)?;
            let role = non_empty_str(item.get("role")).unwrap_or_else(|| DEFAULT_ROLE.to_string());
            Some(TemplateMessage {
                role,
                text: text.to_string(),
            })
        })
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Serves `prompts/list` and `prompts/get` from the prompts collection.
pub struct PromptResolver {
    context: Arc<ExecutionContext>,
    settings: PromptSettings,
}

impl PromptResolver {
    pub fn new(context: Arc<ExecutionContext>, settings: PromptSettings) -> Self {
        Self { context, settings }
    }

    pub async fn list(&self) -> Result<Vec<PromptSummary>, ToolError> {
        let rows = self.fetch_rows(None).await?;
        let summaries: Vec<PromptSummary> = rows
            .iter()
            .filter(|row| row.has_text())
            .map(PromptRow::summary)
            .collect();
        tracing::debug!(count = summaries.len(), "listed prompts");
        Ok(summaries)
    }

    pub async fn get(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<Vec<PromptMessage>, ToolError> {
        let rows = self.fetch_rows(Some(name)).await?;
        let row = rows
            .into_iter()
            .find(|row| row.name == name)
            .ok_or_else(|| ToolError::PromptNotFound(name.to_string()))?;
        Ok(row.render(args))
    }

    fn check_configuration(&self) -> Result<(), ToolError> {
        let settings = &self.settings;
        let Some(fields) = self.context.schema.collection(&settings.collection) else {
            return Err(ToolError::PromptsCollectionMisconfigured(format!(
                "collection \"{}\" is not in the schema; check that it exists and is readable",
                settings.collection
            )));
        };
        for field in [&settings.name_field, &settings.messages_field] {
            if !fields.contains_key(field.as_str()) {
                return Err(ToolError::PromptsCollectionMisconfigured(format!(
                    "collection \"{}\" has no field \"{}\"",
                    settings.collection, field
                )));
            }
        }
        Ok(())
    }

    async fn fetch_rows(&self, name: Option<&str>) -> Result<Vec<PromptRow>, ToolError> {
        self.check_configuration()?;

        let mut filter = Map::new();
        if let Some(name) = name {
            filter.insert(self.settings.name_field.clone(), json!({ "_eq": name }));
        }
        if let Some(status) = &self.settings.status_filter {
            filter.insert(STATUS_FIELD.to_string(), json!({ "_eq": status }));
        }
        let query = ItemQuery {
            filter: (!filter.is_empty()).then_some(Value::Object(filter)),
            limit: Some(if name.is_some() { 1 } else { -1 }),
            ..ItemQuery::default()
        };

        let response = self
            .context
            .backend
            .request(
                BackendRequest::get(endpoints::items(&self.settings.collection))
                    .with_query(query.to_query_pairs()),
            )
            .await?;
        let rows: &[Value] = match &response {
            Value::Array(rows) => rows.as_slice(),
            Value::Object(_) => std::slice::from_ref(&response),
            _ => &[],
        };
        Ok(rows
            .iter()
            .filter_map(|row| PromptRow::from_value(row, &self.settings))
            .collect())
    }
}
