use std::sync::Arc;

use directus_mcp_core::schema::{RawField, RawRelation, Schema, compact_schema};
use serde_json::Value;

use crate::backend::{Backend, BackendRequest};
use crate::endpoints;
use crate::error::{StartupError, ToolError};
use crate::links;

/// Read-only state shared by every tool call: the backend handle, the schema
/// compacted at startup and the public base URL for deep links.
pub struct ExecutionContext {
    pub backend: Arc<dyn Backend>,
    pub schema: Schema,
    pub base_url: String,
    pub system_prompt: Option<String>,
}

impl ExecutionContext {
    pub fn new(backend: Arc<dyn Backend>, schema: Schema, base_url: impl Into<String>) -> Self {
        Self {
            backend,
            schema,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn require_collection(&self, collection: &str) -> Result<(), ToolError> {
        if self.schema.contains_collection(collection) {
            Ok(())
        } else {
            Err(ToolError::CollectionNotFound(collection.to_string()))
        }
    }

    /// Admin link for `record`, keyed by the collection's primary key field.
    /// `None` when no field is flagged as primary key or the record lacks it.
    pub fn item_link(&self, collection: &str, record: &Value) -> Option<String> {
        let pk_field = self.schema.primary_key_field(collection)?;
        let key = links::key_string(record.get(pk_field)?)?;
        Some(links::item_link(&self.base_url, collection, &key))
    }

    /// Admin link for a known key, subject to the same primary key rule.
    pub fn item_link_for_key(&self, collection: &str, key: &str) -> Option<String> {
        self.schema.primary_key_field(collection)?;
        Some(links::item_link(&self.base_url, collection, key))
    }

    pub fn file_link(&self, record: &Value) -> Option<String> {
        let id = links::key_string(record.get("id")?)?;
        Some(links::file_link(&self.base_url, &id))
    }
}

/// Fetch field and relation metadata and compact it.
pub async fn fetch_schema(backend: &dyn Backend) -> Result<Schema, StartupError> {
    let (fields, relations) = tokio::try_join!(
        backend.request(BackendRequest::get(endpoints::fields())),
        backend.request(BackendRequest::get(endpoints::relations())),
    )
    .map_err(|e| StartupError::SchemaFetchFailed(e.to_string()))?;

    let fields: Vec<RawField> = serde_json::from_value(fields)
        .map_err(|e| StartupError::SchemaFetchFailed(format!("unexpected field list: {e}")))?;
    let relations: Vec<RawRelation> = match relations {
        Value::Null => Vec::new(),
        relations => serde_json::from_value(relations).map_err(|e| {
            StartupError::SchemaFetchFailed(format!("unexpected relation list: {e}"))
        })?,
    };

    let schema = compact_schema(&fields, &relations);
    tracing::info!(
        raw_fields = fields.len(),
        relations = relations.len(),
        collections = schema.collections().count(),
        fields = schema.field_count(),
        "schema compacted"
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::backend::stub::StubBackend;
    use reqwest::Method;
    use serde_json::json;

    fn raw_fields() -> Value {
        json!([
            { "collection": "posts", "field": "id", "type": "integer", "schema": { "is_primary_key": true }, "meta": {} },
            { "collection": "posts", "field": "title", "type": "string", "schema": {}, "meta": {} },
            { "collection": "tags", "field": "label", "type": "string", "schema": {}, "meta": {} }
        ])
    }

    fn context() -> ExecutionContext {
        let fields: Vec<RawField> = serde_json::from_value(raw_fields()).unwrap();
        ExecutionContext::new(
            Arc::new(StubBackend::new()),
            compact_schema(&fields, &[]),
            "https://cms.example.com/",
        )
    }

    #[tokio::test]
    async fn fetch_schema_issues_two_requests_and_compacts() {
        let stub = StubBackend::new()
            .with_response(Method::GET, "/fields", raw_fields())
            .with_response(Method::GET, "/relations", json!([]));
        let schema = fetch_schema(&stub).await.expect("schema");
        assert_eq!(schema.field_count(), 3);
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn fetch_schema_failure_is_fatal_kind() {
        let stub = StubBackend::new()
            .with_error(
                Method::GET,
                "/fields",
                BackendError::Http {
                    status: 401,
                    body: "unauthorized".to_string(),
                },
            )
            .with_response(Method::GET, "/relations", json!([]));
        let err = fetch_schema(&stub).await.expect_err("must fail");
        assert!(matches!(err, StartupError::SchemaFetchFailed(_)));
    }

    #[test]
    fn unknown_collections_are_rejected() {
        let ctx = context();
        assert!(ctx.require_collection("posts").is_ok());
        assert!(matches!(
            ctx.require_collection("ghost"),
            Err(ToolError::CollectionNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn item_links_need_a_primary_key_flag() {
        let ctx = context();
        assert_eq!(
            ctx.item_link("posts", &json!({ "id": 5, "title": "x" })),
            Some("https://cms.example.com/admin/content/posts/5".to_string())
        );
        assert_eq!(ctx.item_link("tags", &json!({ "label": "rust" })), None);
        assert_eq!(ctx.item_link_for_key("tags", "1"), None);
        assert_eq!(ctx.item_link("posts", &json!({ "title": "no id" })), None);
    }
}
