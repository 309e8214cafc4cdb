//! Regression models mapping feature vectors to next-week counts

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRow, FeatureSchema};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod gradient_boosting;
pub mod linear;
pub mod tree;

pub use gradient_boosting::{BoostingParams, GradientBoosting, TrainedGradientBoosting};
pub use linear::{LinearParams, LinearRegression, TrainedLinearRegression};

/// Regressor fitted to a feature matrix
pub trait TrainedRegressor: Debug + Send + Sync {
    /// Predict one row
    fn predict(&self, row: &[f64]) -> f64;

    /// Raw, unnormalised importance score per input column
    fn feature_importance(&self) -> Vec<f64>;

    /// Number of input columns the model expects
    fn width(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Algorithm that can be fitted to a feature matrix
pub trait Regressor: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressor + 'static;

    /// Fit on row vectors and their targets
    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// The configured regression algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    GradientBoosting(BoostingParams),
    Linear(LinearParams),
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::GradientBoosting(BoostingParams::default())
    }
}

impl ModelKind {
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelKind::GradientBoosting(params) => params.validate(),
            ModelKind::Linear(params) => params.validate(),
        }
    }

    /// Fit the configured algorithm
    pub fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Box<dyn TrainedRegressor>> {
        Ok(match self {
            ModelKind::GradientBoosting(params) => {
                Box::new(GradientBoosting::new(params.clone())?.fit(rows, targets)?)
            }
            ModelKind::Linear(params) => {
                Box::new(LinearRegression::new(params.clone())?.fit(rows, targets)?)
            }
        })
    }
}

/// Score of one feature in the ranked importance summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}

/// Trained regressor bound to the schema it was trained on.
///
/// Never mutated after training.
#[derive(Debug)]
pub struct ModelArtifact {
    schema: FeatureSchema,
    model: Box<dyn TrainedRegressor>,
    cutoff: Option<NaiveDate>,
    training_rows: usize,
}

impl ModelArtifact {
    pub fn new(schema: FeatureSchema, model: Box<dyn TrainedRegressor>) -> Result<Self> {
        if model.width() != schema.width() {
            return Err(ForecastError::DataError(format!(
                "Model expects {} columns but the schema has {}",
                model.width(),
                schema.width()
            )));
        }
        Ok(Self {
            schema,
            model,
            cutoff: None,
            training_rows: 0,
        })
    }

    /// Attach training metadata
    pub fn with_training_info(mut self, cutoff: NaiveDate, training_rows: usize) -> Self {
        self.cutoff = Some(cutoff);
        self.training_rows = training_rows;
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn cutoff(&self) -> Option<NaiveDate> {
        self.cutoff
    }

    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Predict a row vector laid out according to `schema`
    pub fn predict(&self, schema: &FeatureSchema, values: &[f64]) -> Result<f64> {
        self.schema.ensure_matches(schema)?;
        if values.len() != self.schema.width() {
            return Err(ForecastError::DataError(format!(
                "Feature vector has {} values, expected {}",
                values.len(),
                self.schema.width()
            )));
        }
        Ok(self.model.predict(values))
    }

    /// Predict a feature row
    pub fn predict_row(&self, schema: &FeatureSchema, row: &FeatureRow) -> Result<f64> {
        self.predict(schema, &row.to_vector())
    }

    /// Features ranked by normalised importance, highest first
    pub fn importance(&self) -> Vec<FeatureImportance> {
        let raw = self.model.feature_importance();
        let total: f64 = raw.iter().filter(|s| s.is_finite()).sum();
        let mut ranked: Vec<FeatureImportance> = self
            .schema
            .names()
            .into_iter()
            .zip(raw)
            .map(|(feature, score)| FeatureImportance {
                feature,
                score: if total > 0.0 && score.is_finite() {
                    score / total
                } else {
                    0.0
                },
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.feature.cmp(&b.feature)));
        ranked
    }
}
