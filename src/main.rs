// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::backtest_service::BacktestService;
use crate::infrastructure::analysis_client::AnalysisClient;
use crate::infrastructure::config::load_app_config;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create analysis client (infrastructure layer)
    let source = Arc::new(AnalysisClient::new(
        config.analysis.base_url.clone(),
        config.analysis.timeout(),
    )?);

    // Create services (application layer)
    let backtest_service = BacktestService::new(source, config.validation, config.replay);

    // Create application state
    let state = Arc::new(AppState { backtest_service });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(
        %addr,
        analysis = %config.analysis.base_url,
        tick_interval_ms = config.replay.tick_interval_ms,
        window_cap = config.replay.window_cap,
        "starting camshaft-backtest service"
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
