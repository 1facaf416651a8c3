// Error taxonomy for batch loading
use thiserror::Error;

/// Local precondition failure, raised before any request is sent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("model_name must not be empty")]
    EmptyModelName,

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not reach the analysis service, check that it is running: {0}")]
    Network(String),

    #[error("the analysis service failed with status {status}, try again later")]
    Server { status: u16 },

    #[error("{detail}")]
    Client { status: u16, detail: String },

    #[error("the analysis service returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("no phase angle data was produced, choose another model or adjust the parameters")]
    EmptyResult,

    #[error("a newer batch was loaded while this one was being fetched")]
    Superseded,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Server { .. })
    }

    /// Soft failure: the request worked but its batch is not active
    pub fn is_warning(&self) -> bool {
        matches!(self, FetchError::EmptyResult | FetchError::Superseded)
    }
}

/// Replay control failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("no backtest batch is loaded")]
    NoBatchLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FetchError::from(ValidationError::OutOfRange {
            field: "window_size",
            value: "5".to_string(),
            min: "10".to_string(),
            max: "1000".to_string(),
        });
        assert_eq!(err.to_string(), "window_size must be between 10 and 1000, got 5");

        let err = FetchError::Client {
            status: 404,
            detail: "model not found".to_string(),
        };
        assert_eq!(err.to_string(), "model not found");
    }

    #[test]
    fn test_classification() {
        assert!(FetchError::Network("refused".to_string()).is_retryable());
        assert!(FetchError::Server { status: 503 }.is_retryable());
        assert!(!FetchError::EmptyResult.is_retryable());
        assert!(FetchError::EmptyResult.is_warning());
        assert!(FetchError::Superseded.is_warning());
        assert!(!FetchError::Superseded.is_retryable());
        assert!(!FetchError::from(ValidationError::EmptyModelName).is_warning());
    }
}
