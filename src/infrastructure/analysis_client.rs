// Analysis service client - HTTP implementation of BacktestSource
use crate::application::backtest_source::{BacktestSource, ModelInfo};
use crate::application::error::FetchError;
use crate::domain::sample::{BacktestBatch, BacktestParameters};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const CLIENT_ERROR_FALLBACK: &str = "the request was rejected";

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response onto the fetch error taxonomy
    async fn status_error(response: reqwest::Response) -> FetchError {
        let status = response.status();
        if status.is_server_error() {
            return FetchError::Server {
                status: status.as_u16(),
            };
        }

        let body = response.text().await.unwrap_or_default();
        FetchError::Client {
            status: status.as_u16(),
            detail: client_error_detail(&body),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let body = response.text().await.map_err(network_error)?;
        serde_json::from_str(&body).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

/// FastAPI-style `{"detail": "..."}`; anything else gets the generic message
fn client_error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.as_str().map(str::to_string))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| CLIENT_ERROR_FALLBACK.to_string())
}

fn network_error(e: reqwest::Error) -> FetchError {
    FetchError::Network(e.to_string())
}

#[async_trait]
impl BacktestSource for AnalysisClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, FetchError> {
        let response = self
            .client
            .get(self.url("/raw-data/models"))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let models: ModelsResponse = Self::decode(response).await?;
        tracing::debug!("Found {} models", models.models.len());
        Ok(models.models)
    }

    async fn fetch_batch(&self, params: &BacktestParameters) -> Result<BacktestBatch, FetchError> {
        tracing::debug!(
            model = %params.model_name,
            window_size = params.window_size,
            z_threshold = params.z_threshold,
            prediction_horizon = params.prediction_horizon,
            max_records = params.max_records,
            "requesting backtest batch"
        );

        let response = self
            .client
            .post(self.url("/backtest/model-realtime"))
            .header("Accept", "application/json")
            .json(params)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let batch: BacktestBatch = Self::decode(response).await?;
        if batch.is_empty() {
            return Err(FetchError::EmptyResult);
        }

        tracing::debug!(
            model = %batch.model_name,
            total_records = batch.total_records,
            processed_records = batch.processed_records,
            "received backtest batch"
        );
        Ok(batch)
    }
}
