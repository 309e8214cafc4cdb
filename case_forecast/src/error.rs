//! Error types for the case_forecast crate

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the case_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// An input signal cannot be bucketed consistently: wrong week anchor,
    /// inconsistent sub-region keys, missing weeks or a discontinuous horizon
    #[error("Data gap in '{signal}': {detail}")]
    DataGap { signal: String, detail: String },

    /// Not enough trailing weeks to populate the autoregressive lags
    #[error(
        "Insufficient history: {required} trailing weeks are required but only {available} are available (last observed week: {last_week:?})"
    )]
    InsufficientHistory {
        required: usize,
        available: usize,
        last_week: Option<NaiveDate>,
    },

    /// Training set smaller than the configured minimum after row filtering
    #[error(
        "Insufficient training data: {rows} rows between {first_week:?} and {last_week:?}, at least {minimum} required"
    )]
    InsufficientData {
        rows: usize,
        minimum: usize,
        first_week: Option<NaiveDate>,
        last_week: Option<NaiveDate>,
    },

    /// Feature columns at forecast time differ from those the model was trained on
    #[error("Feature mismatch: missing {missing:?}, unexpected {unexpected:?}")]
    FeatureMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error in configuration files
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] weekly_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    /// Shorthand for a [`ForecastError::DataGap`]
    pub fn data_gap(signal: impl Into<String>, detail: impl Into<String>) -> Self {
        ForecastError::DataGap {
            signal: signal.into(),
            detail: detail.into(),
        }
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Json(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
