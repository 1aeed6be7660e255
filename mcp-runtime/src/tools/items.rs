use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::ItemId;
use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::query::{ItemQuery, WriteQuery};
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadItemsArgs {
    /// The collection to read from
    pub collection: String,
    /// Query parameters (filter, sort, fields, limit, deep, ...). Call read-collections first to learn the collection's fields.
    #[serde(default)]
    pub query: ItemQuery,
}

impl ToolArgs for ReadItemsArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateItemArgs {
    /// The collection to create the item in
    pub collection: String,
    /// Field values of the new item
    pub item: Map<String, Value>,
    /// Fields to return for the created item
    #[serde(default)]
    pub query: Option<WriteQuery>,
}

impl ToolArgs for CreateItemArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateItemArgs {
    /// The collection the item belongs to
    pub collection: String,
    /// Primary key of the item to update
    pub id: ItemId,
    /// Partial field values to apply
    pub data: Map<String, Value>,
    /// Fields to return for the updated item
    #[serde(default)]
    pub query: Option<WriteQuery>,
}

impl ToolArgs for UpdateItemArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteItemArgs {
    /// The collection to delete from
    pub collection: String,
    /// Primary key of the item to delete
    pub id: ItemId,
}

impl ToolArgs for DeleteItemArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "read-items",
            "Read items from any collection.",
            ToolAnnotations::read_only("Read Items"),
            read_items,
        ),
        ToolDefinition::new(
            "create-item",
            "Create a single item in a collection.",
            ToolAnnotations::titled("Create Item"),
            create_item,
        ),
        ToolDefinition::new(
            "update-item",
            "Update a single item in a collection.",
            ToolAnnotations::destructive("Update Item"),
            update_item,
        ),
        ToolDefinition::new(
            "delete-item",
            "Delete a single item from a collection. Confirm with the user before deleting.",
            ToolAnnotations::destructive("Delete Item"),
            delete_item,
        ),
    ]
}

async fn read_items(ctx: Arc<ExecutionContext>, args: ReadItemsArgs) -> ToolResult {
    let request = BackendRequest::get(endpoints::items(&args.collection))
        .with_query(args.query.to_query_pairs());
    let items = ctx.backend.request(request).await?;
    Ok(ResponseEnvelope::success(&items, None))
}

async fn create_item(ctx: Arc<ExecutionContext>, args: CreateItemArgs) -> ToolResult {
    let query = args.query.unwrap_or_default().to_query_pairs();
    let request = BackendRequest::post(endpoints::items(&args.collection), Value::Object(args.item))
        .with_query(query);
    let created = ctx.backend.request(request).await?;
    let link = ctx.item_link(&args.collection, &created);
    Ok(ResponseEnvelope::success(&created, link.as_deref()))
}

async fn update_item(ctx: Arc<ExecutionContext>, args: UpdateItemArgs) -> ToolResult {
    let id = args.id.to_string();
    let query = args.query.unwrap_or_default().to_query_pairs();
    let request = BackendRequest::patch(
        endpoints::item(&args.collection, &id),
        Value::Object(args.data),
    )
    .with_query(query);
    let updated = ctx.backend.request(request).await?;
    let link = ctx
        .item_link(&args.collection, &updated)
        .or_else(|| ctx.item_link_for_key(&args.collection, &id));
    Ok(ResponseEnvelope::success(&updated, link.as_deref()))
}

async fn delete_item(ctx: Arc<ExecutionContext>, args: DeleteItemArgs) -> ToolResult {
    let id = args.id.to_string();
    ctx.backend
        .request(BackendRequest::delete(endpoints::item(&args.collection, &id)))
        .await?;
    Ok(ResponseEnvelope::success(
        &serde_json::json!({ "deleted": true, "collection": args.collection, "id": args.id }),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use directus_mcp_core::error::codes;
    use reqwest::Method;
    use serde_json::json;

    use crate::backend::stub::StubBackend;
    use crate::tools::testing::{data, dispatcher, error, message};

    #[tokio::test]
    async fn read_items_on_unknown_collection_never_reaches_backend() {
        let stub = Arc::new(StubBackend::new());
        let dispatcher = dispatcher(stub.clone(), &[]);
        let envelope = dispatcher
            .dispatch("read-items", json!({ "collection": "ghost_collection", "query": {} }))
            .await;

        let payload = error(&envelope);
        assert!(payload["error"].as_str().unwrap().contains("not found"));
        assert_eq!(payload["code"], json!(codes::COLLECTION_NOT_FOUND));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn read_items_forwards_query() {
        let stub = Arc::new(
            StubBackend::new().with_response(Method::GET, "/items/posts", json!([{ "id": 1 }])),
        );
        let dispatcher = dispatcher(stub.clone(), &[]);
        let envelope = dispatcher
            .dispatch(
                "read-items",
                json!({ "collection": "posts", "query": { "fields": ["id", "title"], "limit": 5 } }),
            )
            .await;

        assert_eq!(data(&envelope), json!([{ "id": 1 }]));
        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].query,
            vec![
                ("fields".to_string(), "id,title".to_string()),
                ("limit".to_string(), "5".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn create_item_attaches_deep_link() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::POST,
            "/items/posts",
            json!({ "id": 42, "title": "Hello" }),
        ));
        let dispatcher = dispatcher(stub.clone(), &[]);
        let envelope = dispatcher
            .dispatch(
                "create-item",
                json!({ "collection": "posts", "item": { "title": "Hello" } }),
            )
            .await;

        assert_eq!(data(&envelope), json!({ "id": 42, "title": "Hello" }));
        assert_eq!(
            message(&envelope).as_deref(),
            Some("https://cms.example.com/admin/content/posts/42")
        );
        assert_eq!(stub.calls()[0].body, Some(json!({ "title": "Hello" })));
    }

    #[tokio::test]
    async fn user_records_link_to_the_users_page() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::POST,
            "/users",
            json!({ "id": "u-7", "email": "ada@example.com" }),
        ));
        let envelope = dispatcher(stub.clone(), &[])
            .dispatch(
                "create-item",
                json!({ "collection": "directus_users", "item": { "email": "ada@example.com" } }),
            )
            .await;

        assert_eq!(
            message(&envelope).as_deref(),
            Some("https://cms.example.com/admin/users/u-7")
        );
        assert_eq!(stub.calls()[0].path(), "/users");
    }

    #[tokio::test]
    async fn create_item_without_primary_key_flag_has_no_link() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::POST,
            "/items/tags",
            json!({ "label": "rust" }),
        ));
        let dispatcher = dispatcher(stub, &[]);
        let envelope = dispatcher
            .dispatch("create-item", json!({ "collection": "tags", "item": { "label": "rust" } }))
            .await;
        assert!(!envelope.is_error());
        assert_eq!(message(&envelope), None);
    }

    #[tokio::test]
    async fn update_item_links_by_argument_when_result_lacks_key() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::PATCH,
            "/items/posts/7",
            json!({ "title": "Renamed" }),
        ));
        let dispatcher = dispatcher(stub, &[]);
        let envelope = dispatcher
            .dispatch(
                "update-item",
                json!({
                    "collection": "posts",
                    "id": 7,
                    "data": { "title": "Renamed" },
                    "query": { "fields": ["title"] }
                }),
            )
            .await;
        assert_eq!(
            message(&envelope).as_deref(),
            Some("https://cms.example.com/admin/content/posts/7")
        );
    }

    #[tokio::test]
    async fn delete_item_is_disabled_by_default_configuration() {
        let stub = Arc::new(StubBackend::new());
        let dispatcher = dispatcher(stub.clone(), &["delete-item"]);

        let listed = dispatcher.registry().list_payload();
        let names: Vec<&str> = listed["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert!(!names.contains(&"delete-item"));

        let envelope = dispatcher
            .dispatch("delete-item", json!({ "collection": "posts", "id": 1 }))
            .await;
        assert_eq!(error(&envelope)["code"], json!(codes::UNKNOWN_TOOL));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn delete_item_when_enabled() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::DELETE,
            "/items/posts/3",
            json!(null),
        ));
        let dispatcher = dispatcher(stub.clone(), &[]);
        let envelope = dispatcher
            .dispatch("delete-item", json!({ "collection": "posts", "id": 3 }))
            .await;
        assert_eq!(
            data(&envelope),
            json!({ "deleted": true, "collection": "posts", "id": 3 })
        );
        assert_eq!(stub.calls()[0].method, Method::DELETE);
    }

    #[tokio::test]
    async fn backend_error_list_is_reported_verbatim() {
        let stub = Arc::new(StubBackend::new().with_error(
            Method::GET,
            "/items/posts",
            crate::backend::BackendError::Api {
                status: 403,
                errors: serde_json::from_value(json!([
                    { "message": "You don't have permission to access this.", "extensions": { "code": "FORBIDDEN" } }
                ]))
                .unwrap(),
            },
        ));
        let dispatcher = dispatcher(stub, &[]);
        let envelope = dispatcher
            .dispatch("read-items", json!({ "collection": "posts" }))
            .await;
        assert_eq!(
            error(&envelope),
            json!({ "error": "You don't have permission to access this.", "code": "FORBIDDEN" })
        );
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid() {
        let stub = Arc::new(StubBackend::new());
        let dispatcher = dispatcher(stub.clone(), &[]);
        let envelope = dispatcher
            .dispatch("create-item", json!({ "collection": "posts" }))
            .await;
        assert_eq!(error(&envelope)["code"], json!(codes::INVALID_ARGUMENTS));
        assert_eq!(stub.call_count(), 0);
    }
}
