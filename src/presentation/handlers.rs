// HTTP request handlers
use crate::application::backtest_source::ModelInfo;
use crate::application::error::{FetchError, ReplayError};
use crate::application::replay_machine::ReplaySnapshot;
use crate::application::replay_session::AngleReading;
use crate::domain::chart::WindowView;
use crate::domain::sample::{BacktestParameters, BatchSummary, Sample};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    response::IntoResponse,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ModelsBody {
    pub models: Vec<ModelInfo>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List models with historical data
pub async fn list_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelsBody>, FetchError> {
    let models = state.backtest_service.list_models().await?;
    Ok(Json(ModelsBody { models }))
}

/// Fetch a batch and make it the active replay
pub async fn load_batch(
    State(state): State<Arc<AppState>>,
    Json(params): Json<BacktestParameters>,
) -> Result<Json<BatchSummary>, FetchError> {
    let summary = state.backtest_service.load_batch(params).await?;
    Ok(Json(summary))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.start().await.map(Json)
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.pause().await.map(Json)
}

pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.resume().await.map(Json)
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.stop().await.map(Json)
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.reset().await.map(Json)
}

pub async fn replay_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplaySnapshot>, ReplayError> {
    state.backtest_service.snapshot().await.map(Json)
}

pub async fn current_sample(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Option<Sample>>, ReplayError> {
    state.backtest_service.current_sample().await.map(Json)
}

/// Samples inside the sliding window ending at the cursor
pub async fn visible_window(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Sample>>, ReplayError> {
    state.backtest_service.visible_window().await.map(Json)
}

/// Visible window with the angle, trend and slope series drawn from it
pub async fn window(State(state): State<Arc<AppState>>) -> Result<Json<WindowView>, ReplayError> {
    state.backtest_service.window_view().await.map(Json)
}

pub async fn current_angles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AngleReading>>, ReplayError> {
    state.backtest_service.current_angle_statuses().await.map(Json)
}

/// Stream defect alerts as server-sent events
pub async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut alerts = Box::pin(state.backtest_service.subscribe_alerts());

    let stream = async_stream::stream! {
        while let Some(alert) = alerts.next().await {
            yield Event::default()
                .event("defect-alert")
                .id(alert.id.to_string())
                .json_data(&alert);
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
