// Local precondition checks for batch requests
use crate::application::error::ValidationError;
use crate::domain::sample::BacktestParameters;
use crate::infrastructure::config::{Bounds, ValidationConfig};
use std::fmt::Display;

fn within<T: PartialOrd + Copy + Display>(
    field: &'static str,
    value: T,
    bounds: &Bounds<T>,
) -> Result<(), ValidationError> {
    if bounds.contains(value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            min: bounds.min.to_string(),
            max: bounds.max.to_string(),
        })
    }
}

/// Reports the first offending field, in request order
pub fn validate_parameters(
    params: &BacktestParameters,
    rules: &ValidationConfig,
) -> Result<(), ValidationError> {
    if params.model_name.trim().is_empty() {
        return Err(ValidationError::EmptyModelName);
    }
    within("window_size", params.window_size, &rules.window_size)?;
    // NaN fails every comparison, so it is rejected here too
    within("z_threshold", params.z_threshold, &rules.z_threshold)?;
    within("prediction_horizon", params.prediction_horizon, &rules.prediction_horizon)?;
    within("max_records", params.max_records, &rules.max_records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BacktestParameters {
        BacktestParameters {
            model_name: "CAM-A".to_string(),
            ..BacktestParameters::default()
        }
    }

    fn with(change: impl FnOnce(&mut BacktestParameters)) -> BacktestParameters {
        let mut p = params();
        change(&mut p);
        p
    }

    #[test]
    fn test_accepts_defaults() {
        assert_eq!(validate_parameters(&params(), &ValidationConfig::default()), Ok(()));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let rules = ValidationConfig::default();
        let mut p = params();
        p.window_size = 10;
        p.z_threshold = 10.0;
        p.max_records = 5000;
        p.prediction_horizon = 1;
        assert!(validate_parameters(&p, &rules).is_ok());
    }

    #[test]
    fn test_rejects_blank_model() {
        let mut p = params();
        p.model_name = "   ".to_string();
        assert_eq!(
            validate_parameters(&p, &ValidationConfig::default()),
            Err(ValidationError::EmptyModelName)
        );
    }

    #[test]
    fn test_reports_offending_field() {
        let rules = ValidationConfig::default();
        let cases = [
            ("window_size", with(|p| p.window_size = 9)),
            ("window_size", with(|p| p.window_size = 1001)),
            ("z_threshold", with(|p| p.z_threshold = 0.05)),
            ("z_threshold", with(|p| p.z_threshold = f64::NAN)),
            ("prediction_horizon", with(|p| p.prediction_horizon = 0)),
            ("max_records", with(|p| p.max_records = 99)),
            ("max_records", with(|p| p.max_records = 5001)),
        ];

        for (expected, p) in cases {
            match validate_parameters(&p, &rules) {
                Err(ValidationError::OutOfRange { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }
}
