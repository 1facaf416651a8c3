// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    alerts, current_angles, current_sample, health_check, list_models, load_batch, pause,
    replay_state, reset, resume, start, stop, visible_window, window,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/models", get(list_models))
        .route("/backtest/load", post(load_batch))
        .route("/backtest/start", post(start))
        .route("/backtest/pause", post(pause))
        .route("/backtest/resume", post(resume))
        .route("/backtest/stop", post(stop))
        .route("/backtest/reset", post(reset))
        .route("/backtest/state", get(replay_state))
        .route("/backtest/current", get(current_sample))
        .route("/backtest/samples", get(visible_window))
        .route("/backtest/window", get(window))
        .route("/backtest/angles", get(current_angles))
        .route("/backtest/alerts", get(alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
