//! Fitting the configured regressor on rows before the cutoff

use crate::error::{ForecastError, Result};
use crate::features::FeatureTable;
use crate::models::{FeatureImportance, ModelArtifact, ModelKind};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

/// Settings of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// First week that is not used for training
    pub cutoff: NaiveDate,
    /// Minimum number of valid rows required to fit
    pub min_rows: usize,
    /// Regression algorithm and its hyperparameters
    pub model: ModelKind,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cutoff: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            min_rows: 52,
            model: ModelKind::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_rows == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_rows must be greater than zero".to_string(),
            ));
        }
        self.model.validate()
    }
}

/// Trained artifact and its ranked feature importance
#[derive(Debug)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub importance: Vec<FeatureImportance>,
}

/// Fits a [`ModelArtifact`] from a feature table
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit on every row strictly before the cutoff
    pub fn fit(&self, table: &FeatureTable) -> Result<TrainingOutcome> {
        let rows = table.training_rows(self.config.cutoff);
        let first_week = rows.first().map(|r| r.week_ending);
        let last_week = rows.last().map(|r| r.week_ending);

        if rows.len() < self.config.min_rows {
            return Err(ForecastError::InsufficientData {
                rows: rows.len(),
                minimum: self.config.min_rows,
                first_week,
                last_week,
            });
        }

        let matrix: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vector()).collect();
        let targets: Vec<f64> = rows.iter().filter_map(|r| r.target).collect();

        let model = self.config.model.fit(&matrix, &targets)?;
        let artifact = ModelArtifact::new(table.schema().clone(), model)?
            .with_training_info(self.config.cutoff, rows.len());
        let importance = artifact.importance();

        info!(
            "Trained {} on {} rows ({:?} to {:?}); top feature: {}",
            artifact.name(),
            rows.len(),
            first_week,
            last_week,
            importance
                .first()
                .map(|f| format!("{} ({:.3})", f.feature, f.score))
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(TrainingOutcome {
            artifact,
            importance,
        })
    }

    /// Weeks covered by the training rows, if any
    pub fn training_range(&self, table: &FeatureTable) -> Option<(NaiveDate, NaiveDate)> {
        let rows = table.training_rows(self.config.cutoff);
        Some((rows.first()?.week_ending, rows.last()?.week_ending))
    }
}
