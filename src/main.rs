//! BridgePay service - cross-chain token transfer orchestration
//!
//! Drives the transfer workflow (form -> review -> confirmation) against the
//! fixed BridgePay bridge contract: validates transfer requests, estimates
//! amounts from spot prices, approves the token allowance, and submits the
//! bridge transfer.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod api;
mod config;
mod contracts;
mod error;
mod metrics;
mod pricing;
mod tokens;
mod workflow;

use config::Settings;
use contracts::BridgeClient;
use metrics::MetricsServer;
use pricing::{Estimator, HttpPriceSource};
use tokens::TokenRegistry;
use workflow::WorkflowController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting BridgePay service v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;

    // Token registry is static for the life of the process
    let registry = Arc::new(TokenRegistry::from_config(&settings.tokens)?);
    info!("Token registry loaded with {} tokens", registry.all().len());

    // Price estimation
    let price_source = Arc::new(HttpPriceSource::new(&settings.price_api)?);
    let estimator = Estimator::new(price_source, registry.clone());

    // Contract client for the fixed bridge address
    let bridge = Arc::new(BridgeClient::connect(
        &settings.chain,
        &settings.bridge,
        registry.clone(),
    )?);
    info!(
        "Bridge contract {} on {} (chain id {})",
        settings.bridge.contract_address, settings.chain.name, settings.chain.chain_id
    );

    // Workflow controller owns all mutable state
    let controller = Arc::new(WorkflowController::new(
        estimator,
        bridge.clone(),
        settings.bridge.clone(),
    ));

    // Log store transitions; a UI binding would subscribe the same way
    let mut store_events = controller.subscribe().await;
    tokio::spawn(async move {
        while let Ok(event) = store_events.recv().await {
            tracing::debug!("Workflow event: {:?}", event);
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start API server
    let api_handle = tokio::spawn({
        let api_config = settings.api.clone();
        let controller = controller.clone();
        let bridge = bridge.clone();
        let registry = registry.clone();
        let networks = settings.networks.clone();
        async move {
            if let Err(e) =
                api::run_server(api_config, controller, bridge, registry, networks).await
            {
                error!("API server error: {}", e);
            }
        }
    });

    info!("BridgePay service is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("BridgePay service stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridgepay=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
