use anyhow::{Context, Result};
use clap::Parser;
use mcp_modes::config::{self, ConfigStore, DEFAULT_MODE};
use mcp_modes::{backend, mcp, routing};
use rmcp::{transport::stdio, ServiceExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mcp-modes")]
#[command(about = "Mode-switching MCP aggregation proxy", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.json")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Override log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = config::load_config(&cli.config).with_context(|| {
        format!(
            "Failed to load configuration from: {}",
            cli.config.display()
        )
    })?;

    // Apply CLI overrides
    if let Some(log_level) = cli.log_level {
        config.logging.level = log_level;
    }
    if let Some(log_format) = cli.log_format {
        config.logging.format = log_format;
    }

    // Initialize logging
    init_logging(&config.logging)?;

    info!("Starting mcp-modes aggregation proxy...");
    info!("  → Config: {}", cli.config.display());
    info!("  → Backends configured: {}", config.mcp_servers.len());
    info!("  → Modes declared: {}", config.modes.len());

    // Connect all configured backends; failures are skipped with a warning
    let backends = backend::connect_backends(&config.mcp_servers).await;

    let starting_mode = config
        .starting_mode
        .clone()
        .unwrap_or_else(|| DEFAULT_MODE.to_string());
    info!("  → Starting mode: {}", starting_mode);

    let store = ConfigStore::new(&cli.config);
    let router = routing::Router::initialize(
        backends,
        config.modes.clone(),
        &starting_mode,
        Some(store),
    )
    .await
    .context("Failed to build initial capability bundles")?;

    // Serve the aggregated view over stdio; the caller speaks MCP on
    // stdin/stdout, which is why all logging goes to stderr.
    let handler = mcp::ProxyServer::new(Arc::new(router));
    let service = handler
        .serve(stdio())
        .await
        .context("Failed to start MCP server on stdio")?;

    info!("mcp-modes is serving on stdio");

    tokio::select! {
        result = service.waiting() => {
            result.context("MCP server terminated abnormally")?;
            info!("Client disconnected, shutting down...");
        }
        _ = shutdown_signal() => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down...");
        },
    }
}

fn init_logging(config: &config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // stdout carries the MCP protocol, so logs must stay on stderr
    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
