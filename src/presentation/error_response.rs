// JSON error responses for the HTTP surface
use crate::application::error::{FetchError, ReplayError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    level: &'static str,
    retryable: bool,
}

fn error_response(
    status: StatusCode,
    error: String,
    level: &'static str,
    retryable: bool,
) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            level,
            retryable,
        }),
    )
        .into_response()
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FetchError::Client { .. } => StatusCode::BAD_REQUEST,
            FetchError::EmptyResult | FetchError::Superseded => StatusCode::CONFLICT,
            FetchError::Network(_) | FetchError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            FetchError::Server { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        let level = if self.is_warning() { "warning" } else { "error" };
        let retryable = self.is_retryable();
        error_response(status, self.to_string(), level, retryable)
    }
}

impl IntoResponse for ReplayError {
    fn into_response(self) -> Response {
        error_response(StatusCode::CONFLICT, self.to_string(), "warning", false)
    }
}
