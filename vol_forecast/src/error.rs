//! Error types for the vol_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;
use vol_math::MathError;

/// Custom error types for the vol_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data loading or column extraction
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter or input validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error in pipeline configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from volatility or pricing math
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error parsing or writing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
