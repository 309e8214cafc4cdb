//! # Case Forecast
//!
//! A Rust library for forecasting weekly disease-case counts from case
//! notifications and climate covariates.
//!
//! ## Features
//!
//! - Weekly aggregation of notification records and daily climate readings
//! - Calendar, autoregressive and lagged climate features
//! - Gradient-boosted regression trees and a linear reference model
//! - Walk-forward recursive forecasting where predictions feed later lags
//! - Week-aligned comparison of model variants against observed cases
//!
//! ## Lag Structure
//!
//! Case lags default to 1, 2, 4 and 8 weeks. Climate lags default to 2, 3, 4
//! and 8 weeks on rainfall, mean temperature and humidity: the vector breeds
//! after rain, so climate shows up in notifications weeks later. Same-week
//! climate is never a predictor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use case_forecast::config::PipelineConfig;
//! use case_forecast::data::DataLoader;
//! use case_forecast::pipeline::Pipeline;
//!
//! # fn main() -> case_forecast::Result<()> {
//! // Load records
//! let events = DataLoader::events_from_csv("notifications.csv")?;
//! let climate = DataLoader::climate_from_csv("climate.csv")?;
//!
//! // Train both variants before the cutoff and forecast the rest
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run_comparison(&events, &climate)?;
//!
//! println!("{}", report.table);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod synthetic;
pub mod train;

// Re-export commonly used types
pub use crate::aggregate::{AggregationConfig, FieldRule, TemporalAggregator};
pub use crate::compare::{ComparisonTable, Comparator};
pub use crate::config::PipelineConfig;
pub use crate::data::{ClimateObservation, DataLoader, EventRecord, WeekAnchor, WeeklySeries};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureSchema, FeatureSynthesizer, FeatureTable, LagConfig, UnifiedSeries};
pub use crate::forecast::{ForecastOutput, ForecastState, RecursiveForecaster};
pub use crate::models::{ModelArtifact, ModelKind, TrainedRegressor};
pub use crate::pipeline::{Pipeline, Variant};
pub use crate::train::{ModelTrainer, TrainingConfig};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
