//! # Weekly Math
//!
//! Numeric kernels for weekly epidemiological series.
//! This crate provides the reducers used to collapse daily readings into
//! weekly values, the cyclical calendar encodings and a small dense
//! least-squares solver.

use thiserror::Error;

pub mod least_squares;
pub mod reducers;
pub mod seasonality;

pub use reducers::{Accumulator, Reducer};
pub use seasonality::{cyclical_encoding, WEEKS_PER_YEAR};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Arithmetic mean of a slice, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0, 9.0]), Some(5.0));
    }
}
