use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::backend::BackendRequest;
use crate::context::ExecutionContext;
use crate::endpoints;
use crate::envelope::ResponseEnvelope;
use crate::error::ToolError;
use crate::query::ItemQuery;
use crate::registry::{ToolAnnotations, ToolArgs, ToolDefinition, ToolResult};

const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Editable file metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileMetadata {
    /// Display title of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// ID of the folder the file lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Description, often used as alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Where the photo was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Focal point x coordinate in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_point_x: Option<f64>,
    /// Focal point y coordinate in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_point_y: Option<f64>,
    /// File name used for downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_download: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileUpdate {
    /// ID of the file to update
    pub id: String,
    #[serde(flatten)]
    pub metadata: FileMetadata,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFilesArgs {
    /// Query parameters for listing file metadata
    #[serde(default)]
    pub query: Option<ItemQuery>,
    /// ID of a single file. Omit to list files.
    #[serde(default)]
    pub id: Option<String>,
    /// Return the raw file content (base64) instead of metadata. Requires `id`.
    #[serde(default)]
    pub raw: Option<bool>,
}

impl ToolArgs for ReadFilesArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImportFileArgs {
    /// URL of the file to import
    pub url: String,
    /// Metadata to store with the imported file
    #[serde(default)]
    pub data: Option<FileMetadata>,
}

impl ToolArgs for ImportFileArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateFilesArgs {
    /// One entry per file: its id plus the metadata fields to change
    pub data: Vec<FileUpdate>,
}

impl ToolArgs for UpdateFilesArgs {}

pub fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "read-files",
            "Read file metadata. Provide a query to list files, an 'id' for a single file, or 'id' with 'raw: true' for the file's content (base64 encoded).",
            ToolAnnotations::read_only("Read Files"),
            read_files,
        ),
        ToolDefinition::new(
            "import-file",
            "Import a file from a web URL. Optionally include 'data' for file metadata (title, folder, ...).",
            ToolAnnotations::titled("Import File"),
            import_file,
        ),
        ToolDefinition::new(
            "update-files",
            "Update the metadata of one or more existing files.",
            ToolAnnotations::titled("Update Files"),
            update_files,
        ),
    ]
}

async fn read_files(ctx: Arc<ExecutionContext>, args: ReadFilesArgs) -> ToolResult {
    let raw = args.raw.unwrap_or(false);
    let Some(id) = args.id else {
        if raw {
            return Err(ToolError::Rejected(
                "Raw file content requires the 'id' of a single file".to_string(),
            ));
        }
        let query = args.query.unwrap_or_default().to_query_pairs();
        let files = ctx
            .backend
            .request(BackendRequest::get(endpoints::files()).with_query(query))
            .await?;
        return Ok(ResponseEnvelope::success(&files, None));
    };

    // Raw reads need `type` for the MIME type, so they always fetch all fields.
    let query = if raw {
        ItemQuery::with_fields(vec!["*".to_string()])
    } else {
        args.query.unwrap_or_default()
    };
    let metadata = ctx
        .backend
        .request(BackendRequest::get(endpoints::file(&id)).with_query(query.to_query_pairs()))
        .await?;
    if metadata.is_null() {
        return Err(ToolError::Rejected(format!("File with ID {id} not found.")));
    }
    if !raw {
        return Ok(ResponseEnvelope::success(&metadata, None));
    }

    let asset = ctx.backend.fetch_asset(&id).await?;
    let mime_type = metadata
        .get("type")
        .and_then(Value::as_str)
        .filter(|mime| !mime.is_empty())
        .map(str::to_string)
        .or(asset.content_type)
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
    Ok(ResponseEnvelope::binary_resource(
        format!("directus://files/{id}/raw"),
        mime_type,
        &asset.bytes,
    ))
}

async fn import_file(ctx: Arc<ExecutionContext>, args: ImportFileArgs) -> ToolResult {
    let body = json!({
        "url": args.url,
        "data": args.data.unwrap_or_default(),
    });
    let imported = ctx
        .backend
        .request(BackendRequest::post(endpoints::files_import(), body))
        .await?;
    let link = ctx.file_link(&imported);
    Ok(ResponseEnvelope::success(&imported, link.as_deref()))
}

async fn update_files(ctx: Arc<ExecutionContext>, args: UpdateFilesArgs) -> ToolResult {
    if args.data.is_empty() {
        return Err(ToolError::Rejected(
            "The 'data' list cannot be empty. Provide at least one file to update.".to_string(),
        ));
    }
    let body = serde_json::to_value(&args.data)
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    let updated = ctx
        .backend
        .request(BackendRequest::patch(endpoints::files(), body))
        .await?;
    Ok(ResponseEnvelope::success(&updated, None))
}
