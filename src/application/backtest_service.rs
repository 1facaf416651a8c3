// Backtest service - Use cases for loading batches and controlling the replay
use crate::application::backtest_source::{BacktestSource, ModelInfo};
use crate::application::error::{FetchError, ReplayError};
use crate::application::replay_machine::ReplaySnapshot;
use crate::application::replay_session::{AngleReading, ReplaySession};
use crate::application::validation::validate_parameters;
use crate::domain::alert::AlertEvent;
use crate::domain::chart::WindowView;
use crate::domain::sample::{BacktestParameters, BatchSummary, Sample};
use crate::infrastructure::config::{ReplaySettings, ValidationConfig};
use futures::stream::Stream;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

const ALERT_CHANNEL_CAPACITY: usize = 256;

struct ActiveSession {
    load_id: u64,
    session: Arc<ReplaySession>,
}

#[derive(Clone)]
pub struct BacktestService {
    source: Arc<dyn BacktestSource>,
    validation: ValidationConfig,
    replay: ReplaySettings,
    active: Arc<RwLock<Option<ActiveSession>>>,
    load_counter: Arc<AtomicU64>,
    alerts: broadcast::Sender<AlertEvent>,
}

impl BacktestService {
    pub fn new(
        source: Arc<dyn BacktestSource>,
        validation: ValidationConfig,
        replay: ReplaySettings,
    ) -> Self {
        let (alerts, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            source,
            validation,
            replay,
            active: Arc::new(RwLock::new(None)),
            load_counter: Arc::new(AtomicU64::new(0)),
            alerts,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, FetchError> {
        self.source.list_models().await
    }

    /// Validate, fetch and install a new batch. On success the previous
    /// session is torn down; on failure it is left untouched. A fetch that
    /// completes after a later-issued load was installed is discarded with
    /// `FetchError::Superseded`.
    pub async fn load_batch(&self, params: BacktestParameters) -> Result<BatchSummary, FetchError> {
        if let Err(e) = validate_parameters(&params, &self.validation) {
            tracing::debug!(error = %e, "rejected backtest parameters");
            return Err(e.into());
        }

        let load_id = self.load_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let batch = match self.source.fetch_batch(&params).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(model = %params.model_name, error = %e, "backtest fetch failed");
                return Err(e);
            }
        };

        if batch.is_empty() {
            tracing::warn!(model = %params.model_name, "backtest fetch returned no samples");
            return Err(FetchError::EmptyResult);
        }

        let summary = batch.summary();
        let session = Arc::new(ReplaySession::new(
            Arc::new(batch),
            self.replay.window_cap,
            self.replay.tick_interval(),
            self.alerts.clone(),
        ));

        let mut active = self.active.write().await;
        if active.as_ref().is_some_and(|current| current.load_id > load_id) {
            tracing::info!(
                load_id,
                model = %summary.model_name,
                "discarding batch superseded by a newer load"
            );
            return Err(FetchError::Superseded);
        }
        if let Some(previous) = active.replace(ActiveSession { load_id, session }) {
            previous.session.reset().await;
        }

        tracing::info!(
            model = %summary.model_name,
            processed_records = summary.processed_records,
            ok = summary.ok_count,
            ng = summary.ng_count,
            status_counts = ?summary.status_counts,
            avg_defect_probability = summary.avg_defect_probability,
            "backtest batch loaded"
        );
        Ok(summary)
    }

    async fn session(&self) -> Result<Arc<ReplaySession>, ReplayError> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| active.session.clone())
            .ok_or(ReplayError::NoBatchLoaded)
    }

    pub async fn start(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.start().await)
    }

    pub async fn pause(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.pause().await)
    }

    pub async fn resume(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.resume().await)
    }

    pub async fn stop(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.stop().await)
    }

    pub async fn reset(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.reset().await)
    }

    pub async fn snapshot(&self) -> Result<ReplaySnapshot, ReplayError> {
        Ok(self.session().await?.snapshot().await)
    }

    pub async fn current_sample(&self) -> Result<Option<Sample>, ReplayError> {
        Ok(self.session().await?.current_sample().await)
    }

    pub async fn visible_window(&self) -> Result<Vec<Sample>, ReplayError> {
        Ok(self.session().await?.visible_window().await)
    }

    pub async fn window_view(&self) -> Result<WindowView, ReplayError> {
        Ok(self.session().await?.window_view().await)
    }

    pub async fn current_angle_statuses(&self) -> Result<Vec<AngleReading>, ReplayError> {
        Ok(self.session().await?.current_angle_statuses().await)
    }

    /// Defect alerts from this point on, across batch reloads. A consumer
    /// that falls behind skips the alerts it missed.
    pub fn subscribe_alerts(&self) -> impl Stream<Item = AlertEvent> + Send + use<> {
        BroadcastStream::new(self.alerts.subscribe()).filter_map(|received| match received {
            Ok(alert) => Some(alert),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "alert subscriber lagged");
                None
            }
        })
    }
}
