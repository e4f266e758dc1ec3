//! Bounce relay API server binary entrypoint.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use bounce_common::config::{AppConfig, load_sender_mapping};
use bounce_engine::registry::SenderRegistry;
use bounce_engine::remediation::SqlRemediator;

use bounce_api::confirm::HttpConfirmer;
use bounce_api::routes::create_app;
use bounce_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("bounce_api=info,bounce_engine=info,bounce_common=info,tower_http=info")
        }))
        .init();

    tracing::info!("Starting bounce relay...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let mapping = load_sender_mapping(&config.sender_config_path)?;

    if !config.basic_auth_enabled() {
        tracing::warn!("Basic auth disabled: BASIC_AUTH_USER and BASIC_AUTH_PASS must both be set");
    }

    // One pool, queue and worker per configured sender
    let mut registry = SenderRegistry::new(config.queue_capacity);
    for (sender, backend) in &mapping {
        let remediator = SqlRemediator::connect(backend, config.db_max_connections)
            .await
            .map_err(|e| anyhow::anyhow!("DB connection test failed for {:?}: {}", sender, e))?;
        registry.register(sender.as_str(), remediator)?;
    }
    let registry = Arc::new(registry);

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let confirmer = Arc::new(HttpConfirmer::new(timeout)?);
    let state = AppState::new(registry.clone(), confirmer, config.clone());

    let app = create_app(state, timeout);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, senders = registry.len(), "Bounce relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopping remediation workers...");
    registry.shutdown();
    registry.stopped().await;

    tracing::info!("Bounce relay stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, stopping gracefully...");
}
