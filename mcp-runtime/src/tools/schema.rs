use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::envelope::ResponseEnvelope;
use crate::error::ToolError;
use crate::registry::{ToolAnnotations, ToolDefinition, ToolResult};

use super::NoArgs;

pub fn read_collections() -> ToolDefinition {
    ToolDefinition::new(
        "read-collections",
        "Retrieve a compact schema of the connected Directus instance: collections, their fields and relations. \
         Field entries are simplified to save tokens and do not match the backend's field definitions; use read-fields for those.",
        ToolAnnotations::read_only("Read Collections"),
        read,
    )
}

async fn read(ctx: Arc<ExecutionContext>, _args: NoArgs) -> ToolResult {
    let schema = serde_json::to_value(&ctx.schema)
        .map_err(|e| ToolError::Rejected(format!("schema could not be serialized: {e}")))?;
    Ok(ResponseEnvelope::success(&schema, None))
}
