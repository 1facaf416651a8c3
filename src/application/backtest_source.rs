// Source trait for historical backtest batches
use crate::application::error::FetchError;
use crate::domain::sample::{BacktestBatch, BacktestParameters};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A predictive model the analysis service can replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub display_name: String,
}

#[async_trait]
pub trait BacktestSource: Send + Sync {
    /// List the models that have historical data
    async fn list_models(&self) -> Result<Vec<ModelInfo>, FetchError>;

    /// Fetch one ordered batch. Parameters are already validated.
    async fn fetch_batch(&self, params: &BacktestParameters) -> Result<BacktestBatch, FetchError>;
}
