//! Lume MCP Server
//!
//! Spawned by an MCP client for service detection and intent extraction.
//! Communicates via stdio JSON-RPC.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use lume_core::config::Config;
use lume_core::detect::ServiceDetector;
use lume_core::extract::IntentExtractor;
use lume_core::generate::create_text_generator;
use lume_core::mcp::McpServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first to get log path; a broken file is reported once logging is up
    let loaded = Config::load();
    let config = Arc::new(match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    });

    // stdout carries JSON-RPC, so logs go to a daily file
    let log_dir = config.logs_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "mcp.log");

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(false)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(file_layer.with_filter(filter))
        .init();

    info!("Lume MCP server starting");
    if let Err(e) = &loaded {
        warn!("Failed to load config, using defaults: {}", e);
    }

    let detector = Arc::new(ServiceDetector::from_config(&config.detector)?);

    // Without a generator the server still answers detection requests
    let extractor = match create_text_generator(&config.generator) {
        Ok(generator) => Some(Arc::new(IntentExtractor::from_config(
            generator,
            &config.generator,
        ))),
        Err(e) => {
            error!("Structured extraction disabled: {}", e);
            None
        }
    };

    let server = McpServer::new(config, detector, extractor);
    server.run().await?;

    info!("Lume MCP server stopped");
    Ok(())
}
