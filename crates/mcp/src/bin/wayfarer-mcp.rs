// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wayfarer_core::Catalog;
use wayfarer_mcp::config::{BackendKind, ServerConfig};
use wayfarer_mcp::providers::Providers;
use wayfarer_mcp::tools::{register_all, ToolContext, ToolRegistry};
use wayfarer_mcp::McpServer;

#[derive(Parser, Debug)]
#[command(name = "wayfarer-mcp")]
#[command(about = "Travel, finance and weather search tools over MCP", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "wayfarer.toml")]
    config: PathBuf,

    /// Data directory for stored search results
    #[arg(short, long, env = "WAYFARER_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Storage backend, overriding the configuration file
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON-RPC stream
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    tracing::info!("Wayfarer MCP server starting");
    tracing::info!("Data directory: {}", args.data_dir.display());

    let mut config = ServerConfig::load(&args.config, args.data_dir)?;
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }

    let store = config.open_store()?;
    let providers = Providers::from_config(&config.providers)?;
    let ctx = ToolContext::new(store.clone(), providers, config.limits.clone());

    let mut registry = ToolRegistry::new();
    register_all(&mut registry, &ctx);
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry, Catalog::new(store));
    server.start().await?;

    Ok(())
}
