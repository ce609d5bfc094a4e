pub mod api;
pub mod core;
pub mod notify;
pub mod providers;
pub mod service;
pub mod setup;
pub mod store;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Wires the configured collaborators into the services behind the router.
pub fn build_state(config: &AppConfig) -> Result<api::AppState> {
    let store = store::open_store(config)?;

    let yahoo = &config.providers.yahoo;
    let rate_cache = Arc::new(Cache::<String, f64>::new(Duration::from_secs(
        yahoo.rate_cache_ttl_secs,
    )));
    let rate_source =
        providers::yahoo_finance::YahooRateSource::new(&yahoo.base_url, Arc::clone(&rate_cache))?;

    let timeout = config.notifier.timeout();
    let delivery = notify::WebhookDelivery::new(timeout)?;
    let notifier = notify::Notifier::new(Arc::new(delivery), timeout, config.notifier.concurrency);

    Ok(api::AppState {
        subscriptions: service::SubscriptionService::new(store),
        rates: service::RateQueryService::new(Arc::new(rate_source)),
        notifier: Arc::new(notifier),
    })
}

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("ratehook starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = api::router(build_state(&config)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("ratehook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Never resolve, otherwise the server would stop right away
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
