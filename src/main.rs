//! campfire demo server.
//!
//! Binds a server from CLI options (or a TOML config file), registers a
//! couple of sample routes, and runs until Ctrl+C.

use std::path::PathBuf;

use clap::Parser;
use regex::Regex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campfire::{Completer, PathMatch, Query, Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "campfire", about = "Minimal HTTP server toolkit demo")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Document root for static file serving (overrides the config file).
    #[arg(long)]
    document_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campfire=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => campfire::config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.document_root {
        config.document_root = Some(root);
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        document_root = ?config.document_root,
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    let server = Server::start(config).await?;

    server.route(
        Regex::new("^/hello$")?,
        |query: Query, _m: PathMatch, end: Completer| {
            let name = query.get("name").unwrap_or("world").to_string();
            let _ = end.end(format!("hello, {name}\n"));
        },
    );

    server.route(
        Regex::new("^/items/([0-9]+)$")?,
        |_query: Query, m: PathMatch, end: Completer| {
            let id = m.group(1).unwrap_or("?").to_string();
            let _ = end.end(serde_json::json!({ "item": id }));
        },
    );

    tracing::info!(address = %server.local_addr(), "campfire running, Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.shutdown();
    server.drain().await;
    tracing::info!("Shutdown complete");

    Ok(())
}
