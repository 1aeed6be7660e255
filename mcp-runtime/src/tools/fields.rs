use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::error::ToolError;
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

/// Definition of a field to create.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewField {
    /// Name of the field
    pub field: String,
    /// Data type, e.g. string, integer, uuid, json, alias
    #[serde(rename = "type")]
    pub field_type: String,
    /// Database column options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Map<String, Value>>,
    /// Presentation options (interface, note, required, special, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

/// Partial field definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FieldChanges {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFieldsArgs {
    /// Collection to read the fields of. Omit for all collections.
    #[serde(default)]
    pub collection: Option<String>,
}

impl ToolArgs for ReadFieldsArgs {
    fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFieldArgs {
    /// Collection the field belongs to
    pub collection: String,
    /// Name of the field
    pub field: String,
}

impl ToolArgs for ReadFieldArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateFieldArgs {
    /// Collection to add the field to
    pub collection: String,
    pub data: NewField,
}

impl ToolArgs for CreateFieldArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateFieldArgs {
    /// Collection containing the field
    pub collection: String,
    /// Name of the field to update
    pub field: String,
    pub data: FieldChanges,
}

impl ToolArgs for UpdateFieldArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "read-fields",
            "Retrieve the full field definitions of all collections or of one collection.",
            ToolAnnotations::read_only("Read Fields"),
            read_fields,
        ),
        ToolDefinition::new(
            "read-field",
            "Retrieve the definition of a single field.",
            ToolAnnotations::read_only("Read Field"),
            read_field,
        ),
        ToolDefinition::new(
            "create-field",
            "Create a new field in a collection.",
            ToolAnnotations::titled("Create Field"),
            create_field,
        ),
        ToolDefinition::new(
            "update-field",
            "Update an existing field's type, schema or meta options.",
            ToolAnnotations::destructive("Update Field"),
            update_field,
        ),
    ]
}

async fn read_fields(ctx: Arc<ExecutionContext>, args: ReadFieldsArgs) -> ToolResult {
    let segments = match &args.collection {
        Some(collection) => endpoints::fields_in(collection),
        None => endpoints::fields(),
    };
    let fields = ctx.backend.request(BackendRequest::get(segments)).await?;
    Ok(ResponseEnvelope::success(&fields, None))
}

async fn read_field(ctx: Arc<ExecutionContext>, args: ReadFieldArgs) -> ToolResult {
    let field = ctx
        .backend
        .request(BackendRequest::get(endpoints::field(&args.collection, &args.field)))
        .await?;
    Ok(ResponseEnvelope::success(&field, None))
}

async fn create_field(ctx: Arc<ExecutionContext>, args: CreateFieldArgs) -> ToolResult {
    let body = to_body(&args.data)?;
    let created = ctx
        .backend
        .request(BackendRequest::post(endpoints::fields_in(&args.collection), body))
        .await?;
    Ok(ResponseEnvelope::success(&created, None))
}

async fn update_field(ctx: Arc<ExecutionContext>, args: UpdateFieldArgs) -> ToolResult {
    let body = to_body(&args.data)?;
    let updated = ctx
        .backend
        .request(BackendRequest::patch(
            endpoints::field(&args.collection, &args.field),
            body,
        ))
        .await?;
    Ok(ResponseEnvelope::success(&updated, None))
}

fn to_body(data: &impl Serialize) -> Result<Value, ToolError> {
    serde_json::to_value(data).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use directus_mcp_core::error::codes;
    use reqwest::Method;
    use serde_json::json;

    use crate::backend::stub::StubBackend;
    use crate::tools::testing::{dispatcher, error};

    #[tokio::test]
    async fn read_fields_routes_by_collection() {
        let stub = Arc::new(
            StubBackend::new()
                .with_response(Method::GET, "/fields", json!([]))
                .with_response(Method::GET, "/fields/posts", json!([])),
        );
        let dispatcher = dispatcher(stub.clone(), &[]);
        dispatcher.dispatch("read-fields", json!({})).await;
        dispatcher.dispatch("read-fields", json!({ "collection": "posts" })).await;

        let paths: Vec<String> = stub.calls().iter().map(|call| call.path()).collect();
        assert_eq!(paths, vec!["/fields", "/fields/posts"]);
    }

    #[tokio::test]
    async fn read_fields_checks_given_collection() {
        let stub = Arc::new(StubBackend::new());
        let envelope = dispatcher(stub.clone(), &[])
            .dispatch("read-fields", json!({ "collection": "ghost" }))
            .await;
        assert_eq!(error(&envelope)["code"], json!(codes::COLLECTION_NOT_FOUND));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn create_field_posts_definition() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::POST,
            "/fields/posts",
            json!({ "field": "subtitle" }),
        ));
        dispatcher(stub.clone(), &[])
            .dispatch(
                "create-field",
                json!({
                    "collection": "posts",
                    "data": { "field": "subtitle", "type": "string", "meta": { "interface": "input" } }
                }),
            )
            .await;
        assert_eq!(
            stub.calls()[0].body,
            Some(json!({ "field": "subtitle", "type": "string", "meta": { "interface": "input" } }))
        );
    }

    #[tokio::test]
    async fn update_field_patches_partial_definition() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::PATCH,
            "/fields/posts/title",
            json!({ "field": "title" }),
        ));
        let envelope = dispatcher(stub.clone(), &[])
            .dispatch(
                "update-field",
                json!({ "collection": "posts", "field": "title", "data": { "meta": { "note": "Headline" } } }),
            )
            .await;
        assert!(!envelope.is_error());
        assert_eq!(stub.calls()[0].body, Some(json!({ "meta": { "note": "Headline" } })));
    }
}
