//! # CRM Server
//!
//! Entry point. Initializes:
//! - Configuration loading
//! - Tracing/logging subsystem
//! - Database pool, Redis and the realtime hub
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use crm_server::config::Settings;
use crm_server::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Settings first so the log format is known
    let settings = Settings::load()?;
    crm_server::telemetry::init_tracing(settings.log.format);

    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
