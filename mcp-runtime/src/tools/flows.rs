use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::NoArgs;
use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::error::ToolError;
use crate::query::ItemQuery;
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerFlowArgs {
    /// The full flow definition as returned by read-flows
    pub flow_definition: Map<String, Value>,
    /// ID of the flow to trigger
    pub flow_id: String,
    /// Collection of the items the flow runs on
    pub collection: String,
    /// Primary keys of the items to run the flow on. Required unless the flow sets requireSelection to false.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Values for the flow's input fields (options.fields)
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

impl ToolArgs for TriggerFlowArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "read-flows",
            "Fetch the manually triggerable flows. Flows automate tasks inside Directus.",
            ToolAnnotations::read_only("Read Flows"),
            read_flows,
        ),
        ToolDefinition::new(
            "trigger-flow",
            "Trigger a manual flow by ID. Call read-flows first and pass the full flow definition. \
             Check options.requireSelection: unless it is false, provide at least one key. \
             The collection must be listed in options.collections, and data must contain every required field of options.fields.",
            ToolAnnotations::titled("Trigger Flow"),
            trigger_flow,
        ),
    ]
}

async fn read_flows(ctx: Arc<ExecutionContext>, _args: NoArgs) -> ToolResult {
    let query = ItemQuery {
        filter: Some(json!({ "trigger": { "_eq": "manual" } })),
        ..ItemQuery::default()
    };
    let flows = ctx
        .backend
        .request(BackendRequest::get(endpoints::flows()).with_query(query.to_query_pairs()))
        .await?;
    Ok(ResponseEnvelope::success(&flows, None))
}

async fn trigger_flow(ctx: Arc<ExecutionContext>, args: TriggerFlowArgs) -> ToolResult {
    validate_trigger(&args)?;

    let mut body = args.data.unwrap_or_default();
    body.insert("collection".to_string(), Value::String(args.collection));
    body.insert("keys".to_string(), json!(args.keys));
    let result = ctx
        .backend
        .request(BackendRequest::post(
            endpoints::flow_trigger(&args.flow_id),
            Value::Object(body),
        ))
        .await?;
    Ok(ResponseEnvelope::success(&result, None))
}

/// Check the call against the flow definition the agent read earlier.
fn validate_trigger(args: &TriggerFlowArgs) -> Result<(), ToolError> {
    let definition = &args.flow_definition;
    let defined_id = definition.get("id").map(display_value).unwrap_or_default();
    if defined_id != args.flow_id {
        return Err(ToolError::Rejected(format!(
            "Flow ID mismatch: provided {} but definition has {}",
            args.flow_id, defined_id
        )));
    }

    let options = definition.get("options").and_then(Value::as_object);
    let allowed: Vec<&str> = options
        .and_then(|options| options.get("collections"))
        .and_then(Value::as_array)
        .map(|collections| collections.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !allowed.contains(&args.collection.as_str()) {
        return Err(ToolError::Rejected(format!(
            "Invalid collection \"{}\". This flow only supports: {}",
            args.collection,
            allowed.join(", ")
        )));
    }

    let requires_selection = options
        .and_then(|options| options.get("requireSelection"))
        .and_then(Value::as_bool)
        != Some(false);
    if requires_selection && args.keys.is_empty() {
        return Err(ToolError::Rejected(
            "This flow requires selecting at least one item, but no keys were provided".to_string(),
        ));
    }

    let required_fields = options
        .and_then(|options| options.get("fields"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|field| {
            field
                .pointer("/meta/required")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .filter_map(|field| field.get("field").and_then(Value::as_str));
    for field in required_fields {
        let present = args.data.as_ref().is_some_and(|data| data.contains_key(field));
        if !present {
            return Err(ToolError::Rejected(format!("Missing required field: {field}")));
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
