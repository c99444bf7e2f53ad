//! Scholar server binary
//!
//! Run with: cargo run -p scholar-agent --bin scholar-agent-server -- --config scholar.toml

use clap::Parser;
use scholar_agent::{config::ScholarConfig, server::ScholarServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "scholar-agent-server", version, about = "Paper pipeline server with live progress")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar_agent=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                  Personal Scholar Agent                   ║
║        Paper Parsing, Summaries and Live Progress         ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let mut config = ScholarConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Data directory: {}", config.storage.data_dir.display());
    tracing::info!("  - Templates: {}", config.storage.templates_dir.display());
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Unreadable input: {:?}", config.pipeline.unreadable_input);

    let prefix = config.server.api_prefix.clone();

    // Create and start server
    let server = ScholarServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}{}", server.address(), prefix);
    println!("  Health: http://{}{}/health", server.address(), prefix);
    println!("\nEndpoints:");
    println!("  POST {}/upload                - Upload a PDF", prefix);
    println!("  GET  {}/tasks/:id             - Task snapshot", prefix);
    println!("  GET  {}/tasks/:id/events      - Live progress (SSE)", prefix);
    println!("  GET  {}/papers                - List papers", prefix);
    println!("  GET  {}/papers/:id/content/:k - Generated content", prefix);
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
