//! Gradient-boosted regression trees

use crate::error::{ForecastError, Result};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{Regressor, TrainedRegressor};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Hyperparameters of the boosted ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Shrinkage applied to every tree, in (0, 1]
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Fraction of rows drawn (without replacement) per tree, in (0, 1]
    pub subsample: f64,
    /// Fraction of columns drawn per tree, in (0, 1]
    pub colsample: f64,
    /// Seed of the row/column sampler
    pub seed: u64,
    /// Minimum rows in each leaf
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            learning_rate: 0.01,
            max_depth: 6,
            subsample: 0.8,
            colsample: 0.8,
            seed: 42,
            min_samples_leaf: 1,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be greater than zero".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be greater than zero".to_string(),
            ));
        }
        for (label, value) in [
            ("learning_rate", self.learning_rate),
            ("subsample", self.subsample),
            ("colsample", self.colsample),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in (0, 1], got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

/// Squared-error gradient boosting
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    name: String,
    params: BoostingParams,
}

/// Fitted boosted ensemble
#[derive(Debug, Clone)]
pub struct TrainedGradientBoosting {
    name: String,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    gains: Vec<f64>,
    width: usize,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: format!(
                "Gradient Boosting (trees={}, lr={}, depth={})",
                params.n_estimators, params.learning_rate, params.max_depth
            ),
            params,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl Regressor for GradientBoosting {
    type Trained = TrainedGradientBoosting;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(ForecastError::DataError(format!(
                "Cannot fit on {} rows and {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(ForecastError::DataError(
                "All feature rows must have the same width".to_string(),
            ));
        }

        let n = rows.len();
        let p = &self.params;
        let row_count = ((n as f64 * p.subsample).round() as usize).clamp(1, n);
        let col_count = ((width as f64 * p.colsample).round() as usize).clamp(1, width.max(1));
        let tree_params = TreeParams {
            max_depth: p.max_depth,
            min_samples_leaf: p.min_samples_leaf,
        };

        let base_score = weekly_math::mean(targets).unwrap_or(0.0);
        let mut predictions = vec![base_score; n];
        let mut gains = vec![0.0; width];
        let mut trees = Vec::with_capacity(p.n_estimators);
        let mut rng = StdRng::seed_from_u64(p.seed);

        for round in 0..p.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, pred)| y - pred)
                .collect();

            let mut samples = sample(&mut rng, n, row_count).into_vec();
            samples.sort_unstable();
            let mut features = if width == 0 {
                Vec::new()
            } else {
                sample(&mut rng, width, col_count).into_vec()
            };
            features.sort_unstable();

            let tree = RegressionTree::fit(rows, &residuals, &samples, &features, tree_params, &mut gains);
            for (pred, row) in predictions.iter_mut().zip(rows) {
                *pred += p.learning_rate * tree.predict(row);
            }
            trees.push(tree);

            if round % 100 == 0 {
                let mse = targets
                    .iter()
                    .zip(&predictions)
                    .map(|(y, pred)| (y - pred).powi(2))
                    .sum::<f64>()
                    / n as f64;
                debug!("Boosting round {}: training MSE {:.4}", round, mse);
            }
        }

        Ok(TrainedGradientBoosting {
            name: self.name.clone(),
            base_score,
            learning_rate: p.learning_rate,
            trees,
            gains,
            width,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedGradientBoosting {
    pub fn trees(&self) -> usize {
        self.trees.len()
    }
}

impl TrainedRegressor for TrainedGradientBoosting {
    fn predict(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.learning_rate * tree.predict(row))
                .sum::<f64>()
    }

    fn feature_importance(&self) -> Vec<f64> {
        self.gains.clone()
    }

    fn width(&self) -> usize {
        self.width
    }

    fn name(&self) -> &str {
        &self.name
    }
}
