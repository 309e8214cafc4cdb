//! TOML configuration of a pipeline run
//!
//! Every section is optional. Omitted sections fall back to the settings of
//! the regional dengue study the pipeline was built for: the twenty
//! municipalities of the II GERES health region, 2019 to 2024, trained on
//! everything before 2024 and compared over 2024.

use crate::aggregate::{AggregationConfig, FieldRule};
use crate::data::WeekAnchor;
use crate::error::{ForecastError, Result};
use crate::features::LagConfig;
use crate::train::TrainingConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Municipality codes of the II GERES health region
pub const DEFAULT_REGION_CODES: [&str; 20] = [
    "260290", "260410", "260845", "260850", "260950", "261060", "261560", "261640", "260190",
    "260415", "260500", "260540", "260800", "260890", "260900", "260990", "261040", "261230",
    "261450", "261618",
];

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_aggregation")]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub features: FeaturesConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub comparison: ComparisonConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregation: default_aggregation(),
            features: FeaturesConfig::default(),
            training: TrainingConfig::default(),
            comparison: ComparisonConfig::default(),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn default_aggregation() -> AggregationConfig {
    AggregationConfig {
        anchor: WeekAnchor::Sunday,
        region_codes: Some(DEFAULT_REGION_CODES.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>()),
        start: Some(ymd(2019, 1, 1)),
        end: Some(ymd(2024, 12, 31)),
    }
}

// =============================================================================
// Features
// =============================================================================

/// Target naming, weekly climate rules and lag structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Name of the weekly case series
    pub target_name: String,
    pub lags: LagConfig,
    /// Weekly reduction of each climate field
    pub climate: Vec<FieldRule>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            target_name: "cases".to_string(),
            lags: LagConfig::default(),
            climate: FieldRule::defaults(),
        }
    }
}

impl FeaturesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_name.trim().is_empty() {
            return Err(ForecastError::Config("features.target_name must not be empty".to_string()));
        }
        self.lags
            .validate()
            .map_err(|e| ForecastError::Config(format!("features.lags: {}", e)))?;

        let mut names: HashSet<&str> = HashSet::new();
        names.insert(self.target_name.as_str());
        if let Some(rule) = self.climate.iter().find(|r| !names.insert(r.name.as_str())) {
            return Err(ForecastError::Config(format!(
                "Climate series name '{}' is used more than once",
                rule.name
            )));
        }

        let unknown: Vec<&String> = self
            .lags
            .exogenous_signals
            .iter()
            .filter(|s| !self.climate.iter().any(|r| &r.name == *s))
            .collect();
        if !unknown.is_empty() {
            return Err(ForecastError::Config(format!(
                "Exogenous signals {:?} have no climate rule",
                unknown
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Comparison
// =============================================================================

/// Reporting window of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Last week to forecast; `None` forecasts every week the feature table
    /// has after the cutoff
    pub horizon_end: Option<NaiveDate>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            window_start: ymd(2024, 1, 1),
            window_end: ymd(2024, 12, 31),
            horizon_end: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ForecastError::Config(e.to_string()))
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.aggregation.start, self.aggregation.end) {
            if start > end {
                return Err(ForecastError::Config(format!(
                    "aggregation.start {} is after aggregation.end {}",
                    start, end
                )));
            }
        }
        if matches!(&self.aggregation.region_codes, Some(codes) if codes.is_empty()) {
            return Err(ForecastError::Config(
                "aggregation.region_codes is empty; omit it to keep every region".to_string(),
            ));
        }

        self.features.validate()?;
        self.training
            .validate()
            .map_err(|e| ForecastError::Config(format!("training: {}", e)))?;

        let comparison = &self.comparison;
        if comparison.window_start > comparison.window_end {
            return Err(ForecastError::Config(format!(
                "comparison.window_start {} is after comparison.window_end {}",
                comparison.window_start, comparison.window_end
            )));
        }
        if let Some(horizon_end) = comparison.horizon_end {
            if horizon_end < self.training.cutoff {
                return Err(ForecastError::Config(format!(
                    "comparison.horizon_end {} is before the training cutoff {}",
                    horizon_end, self.training.cutoff
                )));
            }
        }
        Ok(())
    }
}
