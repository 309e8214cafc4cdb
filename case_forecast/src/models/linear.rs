//! Ordinary least squares on the feature vector

use crate::error::{ForecastError, Result};
use crate::models::{Regressor, TrainedRegressor};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use weekly_math::least_squares::{fit_least_squares, LeastSquaresFit};

/// Parameters of the linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearParams {
    /// Ridge penalty on the coefficients; 0 gives ordinary least squares
    pub ridge: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self { ridge: 0.0 }
    }
}

impl LinearParams {
    pub fn validate(&self) -> Result<()> {
        if self.ridge < 0.0 || !self.ridge.is_finite() {
            return Err(ForecastError::InvalidParameter(format!(
                "ridge must be a non-negative number, got {}",
                self.ridge
            )));
        }
        Ok(())
    }
}

/// Linear regression model
#[derive(Debug, Clone)]
pub struct LinearRegression {
    name: String,
    params: LinearParams,
}

/// Fitted linear regression
#[derive(Debug, Clone)]
pub struct TrainedLinearRegression {
    name: String,
    fit: LeastSquaresFit,
    column_std: Vec<f64>,
}

impl LinearRegression {
    pub fn new(params: LinearParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: format!("Linear Regression (ridge={})", params.ridge),
            params,
        })
    }
}

impl Regressor for LinearRegression {
    type Trained = TrainedLinearRegression;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Trained> {
        let fit = fit_least_squares(rows, targets, self.params.ridge)?;
        let column_std = (0..fit.coefficients.len())
            .map(|j| {
                let sd = rows.iter().map(|r| r[j]).std_dev();
                if sd.is_finite() {
                    sd
                } else {
                    0.0
                }
            })
            .collect();

        Ok(TrainedLinearRegression {
            name: self.name.clone(),
            fit,
            column_std,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedLinearRegression {
    pub fn intercept(&self) -> f64 {
        self.fit.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.fit.coefficients
    }
}

impl TrainedRegressor for TrainedLinearRegression {
    fn predict(&self, row: &[f64]) -> f64 {
        self.fit.predict(row)
    }

    /// |β| scaled by the column's standard deviation
    fn feature_importance(&self) -> Vec<f64> {
        self.fit
            .coefficients
            .iter()
            .zip(&self.column_std)
            .map(|(beta, sd)| beta.abs() * sd)
            .collect()
    }

    fn width(&self) -> usize {
        self.fit.coefficients.len()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
