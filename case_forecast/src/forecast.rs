//! Walk-forward recursive forecasting
//!
//! The forecaster is a small state machine. [`ForecastState`] holds the
//! observed target history; every step reads its autoregressive lags from the
//! state, predicts, clamps at zero and appends the prediction, so later steps
//! see earlier predictions exactly as if they had been observed.

use crate::data::{WeekAnchor, WeeklyPoint, WeeklySeries};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureTable, UnifiedSeries};
use crate::models::ModelArtifact;
use chrono::{Duration, NaiveDate};
use log::{debug, info};

/// Append-only buffer of observed and predicted target values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastState {
    values: Vec<f64>,
    last_week: NaiveDate,
}

impl ForecastState {
    /// Seed the state with contiguous history ending at `last_week`.
    /// At least `required` values are needed.
    pub fn new(last_week: NaiveDate, history: Vec<f64>, required: usize) -> Result<Self> {
        if history.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                available: history.len(),
                last_week: Some(last_week),
            });
        }
        Ok(Self {
            values: history,
            last_week,
        })
    }

    /// Seed the state with the unified target values of every week strictly
    /// before `cutoff`
    pub fn from_unified(unified: &UnifiedSeries, cutoff: NaiveDate, required: usize) -> Result<Self> {
        let observed: Vec<_> = unified
            .weeks()
            .iter()
            .take_while(|w| w.week_ending < cutoff)
            .collect();

        let last_week = match observed.last() {
            Some(w) => w.week_ending,
            None => {
                return Err(ForecastError::InsufficientHistory {
                    required,
                    available: 0,
                    last_week: None,
                })
            }
        };

        Self::new(last_week, observed.iter().map(|w| w.target).collect(), required)
    }

    /// Value `k` positions back; `lag(1)` is the most recent value
    pub fn lag(&self, k: usize) -> Option<f64> {
        if k == 0 || k > self.values.len() {
            return None;
        }
        Some(self.values[self.values.len() - k])
    }

    /// Append one value for the week after the current last week
    fn push(&mut self, value: f64) {
        self.values.push(value);
        self.last_week += Duration::weeks(1);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Week of the most recent value
    pub fn last_week(&self) -> NaiveDate {
        self.last_week
    }
}

/// Record of one recursive step
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastStep {
    pub week_ending: NaiveDate,
    /// Feature vector fed to the model, after the lag overwrite
    pub features: Vec<f64>,
    /// Model output before clamping
    pub raw_prediction: f64,
    /// Clamped value appended to the state
    pub prediction: f64,
}

/// Forecast series with its step trace
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutput {
    pub series: WeeklySeries,
    pub steps: Vec<ForecastStep>,
}

/// Walk-forward forecaster over a read-only artifact
#[derive(Debug)]
pub struct RecursiveForecaster<'a> {
    artifact: &'a ModelArtifact,
    name: String,
    anchor: WeekAnchor,
}

impl<'a> RecursiveForecaster<'a> {
    pub fn new(artifact: &'a ModelArtifact, anchor: WeekAnchor) -> Self {
        Self {
            artifact,
            name: format!("{}_forecast", artifact.schema().target),
            anchor,
        }
    }

    /// Name given to the output series
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Forecast every row of `horizon` in order, extending `state` by one
    /// value per row
    pub fn forecast(&self, horizon: &FeatureTable, state: &mut ForecastState) -> Result<ForecastOutput> {
        let schema = horizon.schema();
        self.artifact.schema().ensure_matches(schema)?;

        let required = schema.max_target_lag();
        if state.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                available: state.len(),
                last_week: Some(state.last_week()),
            });
        }

        let mut steps = Vec::with_capacity(horizon.len());
        let mut points = Vec::with_capacity(horizon.len());

        for row in horizon.rows() {
            let expected = state.last_week() + Duration::weeks(1);
            if row.week_ending != expected {
                return Err(ForecastError::data_gap(
                    self.name.as_str(),
                    format!(
                        "forecast row for {} does not follow the last known week {} (expected {})",
                        row.week_ending,
                        state.last_week(),
                        expected
                    ),
                ));
            }

            let mut step_row = row.clone();
            for (slot, &k) in step_row.target_lags.iter_mut().zip(&schema.target_lags) {
                *slot = state.lag(k).ok_or_else(|| ForecastError::InsufficientHistory {
                    required: k,
                    available: state.len(),
                    last_week: Some(state.last_week()),
                })?;
            }

            let features = step_row.to_vector();
            let raw_prediction = self.artifact.predict(schema, &features)?;
            let prediction = raw_prediction.max(0.0);

            debug!(
                "Week {}: lag1={:?} raw={:.4} clamped={:.4}",
                row.week_ending,
                state.lag(1),
                raw_prediction,
                prediction
            );

            state.push(prediction);
            points.push(WeeklyPoint {
                week_ending: row.week_ending,
                value: prediction,
            });
            steps.push(ForecastStep {
                week_ending: row.week_ending,
                features,
                raw_prediction,
                prediction,
            });
        }

        let series = WeeklySeries::new(self.name.clone(), self.anchor, points)?;
        info!(
            "Forecast {} weeks of '{}' ({:?} to {:?}), total {:.1}",
            series.len(),
            self.name,
            series.first_week(),
            series.last_week(),
            series.total()
        );

        Ok(ForecastOutput { series, steps })
    }
}
