use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::query::ItemQuery;
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFoldersArgs {
    /// Query parameters for listing folders
    #[serde(default)]
    pub query: Option<ItemQuery>,
}

impl ToolArgs for ReadFoldersArgs {}

pub fn read_folders() -> ToolDefinition {
    ToolDefinition::new(
        "read-folders",
        "Read the folders files are organised in. Useful to find a folder id before importing or moving files.",
        ToolAnnotations::read_only("Read Folders"),
        read,
    )
}

async fn read(ctx: Arc<ExecutionContext>, args: ReadFoldersArgs) -> ToolResult {
    let query = args.query.unwrap_or_default().to_query_pairs();
    let folders = ctx
        .backend
        .request(BackendRequest::get(endpoints::folders()).with_query(query))
        .await?;
    Ok(ResponseEnvelope::success(&folders, None))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Method;
    use serde_json::json;

    use crate::backend::stub::StubBackend;
    use crate::tools::testing::{data, dispatcher};

    #[tokio::test]
    async fn lists_folders() {
        let stub = Arc::new(StubBackend::new().with_response(
            Method::GET,
            "/folders",
            json!([{ "id": "f-1", "name": "Brand", "parent": null }]),
        ));
        let envelope = dispatcher(stub.clone(), &[])
            .dispatch("read-folders", json!({ "query": { "sort": ["name"] } }))
            .await;
        assert_eq!(data(&envelope)[0]["name"], json!("Brand"));
        assert_eq!(stub.calls()[0].query, vec![("sort".to_string(), "name".to_string())]);
    }
}
