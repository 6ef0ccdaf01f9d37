//! slircbot - connects to the configured networks and runs the enabled
//! plugins until interrupted.

use slirc_bot::{Config, Session};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        version = slirc_bot::VERSION,
        networks = config.networks.len(),
        plugins = config.plugins.enabled.len(),
        "Starting slircbot"
    );

    slirc_bot::metrics::init();
    if let Some(port) = config.metrics_port {
        tokio::spawn(slirc_bot::http::run_http_server(port));
    }

    let mut session = Session::new(config).map_err(|e| {
        error!(error = %e, "Failed to start session");
        e
    })?;

    let ready = session.load_enabled().await;
    info!(plugins = ready, "plugins loaded");

    session
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for interrupt");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Goodbye");
    Ok(())
}
