use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::ItemId;
use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::query::ItemQuery;
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadCommentsArgs {
    /// Query parameters, e.g. a filter on collection and item
    #[serde(default)]
    pub query: ItemQuery,
}

impl ToolArgs for ReadCommentsArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpsertCommentArgs {
    /// ID of the comment to update. Omit to create a new comment.
    #[serde(default)]
    pub id: Option<String>,
    /// Collection the item belongs to
    pub collection: String,
    /// Primary key of the item to comment on
    pub item: ItemId,
    /// The comment text
    pub comment: String,
}

impl ToolArgs for UpsertCommentArgs {
    fn collection(&self) -> Option<&str> {
        Some(&self.collection)
    }
}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "read-comments",
            "Fetch comments left on collection items.",
            ToolAnnotations::read_only("Read Comments"),
            read_comments,
        ),
        ToolDefinition::new(
            "upsert-comment",
            "Create a comment on an item, or update one when 'id' is given. \
             To mention a user, look up their ID with read-users and write it as @<uuid> inside the text, \
             e.g. \"Hey @8cc67ebc-3c52-475a-9ae6-fba26963a9ad, can you check this?\". \
             Keep comments to two or three sentences.",
            ToolAnnotations::titled("Create or Update Comment"),
            upsert_comment,
        ),
    ]
}

async fn read_comments(ctx: Arc<ExecutionContext>, args: ReadCommentsArgs) -> ToolResult {
    let comments = ctx
        .backend
        .request(BackendRequest::get(endpoints::comments()).with_query(args.query.to_query_pairs()))
        .await?;
    Ok(ResponseEnvelope::success(&comments, None))
}

async fn upsert_comment(ctx: Arc<ExecutionContext>, args: UpsertCommentArgs) -> ToolResult {
    let body = json!({
        "collection": args.collection,
        "item": args.item,
        "comment": args.comment,
    });
    let request = match &args.id {
        Some(id) => BackendRequest::patch(endpoints::comment(id), body),
        None => BackendRequest::post(endpoints::comments(), body),
    };
    let comment = ctx.backend.request(request).await?;
    Ok(ResponseEnvelope::success(&comment, None))
}
