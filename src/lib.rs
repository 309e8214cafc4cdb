//! # casecast
//!
//! Workspace facade for weekly case forecasting.
//!
//! The pipeline lives in [`case_forecast`]; the numeric kernels it builds on
//! live in [`weekly_math`].
//!
//! ## Example
//!
//! ```
//! use casecast_workspace::forecast_crate_name;
//!
//! assert_eq!(forecast_crate_name(), "case_forecast");
//! ```

pub use case_forecast;
pub use weekly_math;

pub use case_forecast::{ForecastError, Pipeline, PipelineConfig, Variant};

/// Name of the forecasting crate this facade wraps.
pub fn forecast_crate_name() -> &'static str {
    case_forecast::NAME
}

/// Version of the forecasting crate this facade wraps.
pub fn forecast_crate_version() -> &'static str {
    case_forecast::VERSION
}
