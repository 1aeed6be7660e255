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
pub struct UsersMeArgs {
    /// Fields to return for the current user, e.g. ["id", "email", "role.name"]
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl ToolArgs for UsersMeArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadUsersArgs {
    /// Query parameters (filter, sort, fields, limit, deep, ...)
    #[serde(default)]
    pub query: ItemQuery,
}

impl ToolArgs for ReadUsersArgs {}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "users-me",
            "Retrieve information about the current user.",
            ToolAnnotations::read_only("Current User"),
            users_me,
        ),
        ToolDefinition::new(
            "read-users",
            "Retrieve information about users.",
            ToolAnnotations::read_only("Read Users"),
            read_users,
        ),
    ]
}

async fn users_me(ctx: Arc<ExecutionContext>, args: UsersMeArgs) -> ToolResult {
    let query = args.fields.map(ItemQuery::with_fields).unwrap_or_default();
    let me = ctx
        .backend
        .request(BackendRequest::get(endpoints::users_me()).with_query(query.to_query_pairs()))
        .await?;
    Ok(ResponseEnvelope::success(&me, None))
}

async fn read_users(ctx: Arc<ExecutionContext>, args: ReadUsersArgs) -> ToolResult {
    let users = ctx
        .backend
        .request(BackendRequest::get(endpoints::users()).with_query(args.query.to_query_pairs()))
        .await?;
    Ok(ResponseEnvelope::success(&users, None))
}
