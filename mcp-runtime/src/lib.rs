//! Model Context Protocol server exposing a Directus instance as agent tools.
//!
//! Startup reads the configuration, authenticates, fetches and compacts the
//! backend schema once, builds the tool registry and then serves JSON-RPC
//! over stdio until the client disconnects.

use std::sync::Arc;

use serde_json::json;

pub mod backend;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod links;
pub mod prompts;
pub mod query;
pub mod registry;
pub mod server;
pub mod tools;
mod util;

pub use config::ServerArgs;

use config::ServerConfig;
use context::{ExecutionContext, fetch_schema};
use dispatch::Dispatcher;
use error::StartupError;
use prompts::PromptResolver;
use registry::ToolRegistry;
use server::McpServer;
use util::{connect, to_pretty_json};

/// Run the server to completion and return the process exit code.
pub async fn run(args: ServerArgs) -> i32 {
    let server = match start(args).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "startup failed");
            let payload = json!({
                "error": err.code(),
                "message": err.to_string(),
            });
            eprintln!("{}", to_pretty_json(&payload));
            return 1;
        }
    };

    match server.serve_stdio().await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "transport failed");
            let payload = json!({
                "error": "mcp_server_error",
                "message": err.to_string(),
            });
            eprintln!("{}", to_pretty_json(&payload));
            1
        }
    }
}

async fn start(args: ServerArgs) -> Result<McpServer, StartupError> {
    let config = ServerConfig::from_args(args)?;
    tracing::info!(
        url = %config.base_url,
        disabled_tools = ?config.disabled_tools,
        system_prompt = config.system_prompt.is_some(),
        prompts = config.prompts.as_ref().map(|p| p.collection.as_str()),
        "starting directus mcp server"
    );

    let backend = connect(&config).await?;
    let schema = fetch_schema(backend.as_ref()).await?;

    let context = Arc::new(
        ExecutionContext::new(backend, schema, config.public_base_url())
            .with_system_prompt(config.system_prompt.clone()),
    );
    let registry = ToolRegistry::build(
        tools::catalogue(config.system_prompt.is_some()),
        &config.disabled_tools,
    )?;
    tracing::info!(tools = ?registry.names().collect::<Vec<_>>(), "tools registered");

    let prompts = config
        .prompts
        .map(|settings| PromptResolver::new(context.clone(), settings));
    Ok(McpServer::new(Dispatcher::new(registry, context), prompts))
}
