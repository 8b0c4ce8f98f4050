//! Error types for the forecasting core

use thiserror::Error;

/// Errors raised by the forecasting pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// History window did not contain the required number of days
    #[error("Expected {expected} days of weather data, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A day in the array-form input had the wrong number of features
    #[error("Day {day} has {actual} features, expected {expected}")]
    FeatureCount {
        day: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model prediction failed: {0}")]
    ModelFailure(String),

    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },
}

impl ForecastError {
    /// Whether the error was caused by the caller's input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ForecastError::ShapeMismatch { .. }
                | ForecastError::FeatureCount { .. }
                | ForecastError::InvalidInput(_)
        )
    }
}

pub type PipelineResult<T> = Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_classified() {
        assert!(ForecastError::ShapeMismatch { expected: 14, actual: 10 }.is_input_error());
        assert!(ForecastError::FeatureCount { day: 3, expected: 10, actual: 9 }.is_input_error());
        assert!(!ForecastError::ModelFailure("nan".into()).is_input_error());
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = ForecastError::ShapeMismatch { expected: 14, actual: 10 };
        assert_eq!(err.to_string(), "Expected 14 days of weather data, got 10");
    }
}
