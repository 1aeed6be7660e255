use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use directus_mcp_runtime::{ServerArgs, run};

#[derive(Parser)]
#[command(
    name = "directus-mcp",
    version,
    about = "Directus MCP server: exposes a Directus instance to agents over stdio"
)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "directus_mcp=info,directus_mcp_runtime=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let code = run(cli.server).await;
    std::process::exit(code);
}
