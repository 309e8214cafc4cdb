//! Week-aligned comparison of forecasts against actual counts

use crate::data::{WeeklySeries, DATE_FORMAT};
use crate::error::{ForecastError, Result};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use chrono::NaiveDate;
use log::info;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs::File;
use std::path::Path;

/// One week of the comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub week_ending: NaiveDate,
    pub actual: Option<f64>,
    /// One entry per forecast, in the order they were given
    pub forecasts: Vec<Option<f64>>,
    /// `forecast - actual`, only where both values exist
    pub deltas: Vec<Option<f64>>,
}

/// Window totals and paired accuracy of one forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub name: String,
    /// Sum of the actual series over the window
    pub actual_total: f64,
    /// Sum of the forecast over the window
    pub forecast_total: f64,
    /// `forecast_total - actual_total`
    pub total_delta: f64,
    /// Weeks where both the actual and the forecast exist
    pub weeks_compared: usize,
    /// Metrics over the compared weeks; `None` when no week pairs up
    pub accuracy: Option<ForecastAccuracy>,
}

/// Actual and forecast series outer-joined on week within a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub actual_name: String,
    pub forecast_names: Vec<String>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub rows: Vec<ComparisonRow>,
    pub summaries: Vec<ForecastSummary>,
}

impl ComparisonTable {
    pub fn summary(&self, name: &str) -> Option<&ForecastSummary> {
        self.summaries.iter().find(|s| s.name == name)
    }

    pub fn row(&self, week: NaiveDate) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.week_ending == week)
    }

    /// Frame with `week_ending`, the actual column, one column per forecast
    /// and one `delta_<forecast>` column per forecast, all nullable
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(2 + 2 * self.forecast_names.len());
        columns.push(Series::new(
            "week_ending",
            self.rows
                .iter()
                .map(|r| r.week_ending.format(DATE_FORMAT).to_string())
                .collect::<Vec<String>>(),
        ));
        columns.push(Series::new(
            self.actual_name.as_str(),
            self.rows.iter().map(|r| r.actual).collect::<Vec<Option<f64>>>(),
        ));
        for (j, name) in self.forecast_names.iter().enumerate() {
            columns.push(Series::new(
                name.as_str(),
                self.rows.iter().map(|r| r.forecasts[j]).collect::<Vec<Option<f64>>>(),
            ));
        }
        for (j, name) in self.forecast_names.iter().enumerate() {
            columns.push(Series::new(
                format!("delta_{}", name).as_str(),
                self.rows.iter().map(|r| r.deltas[j]).collect::<Vec<Option<f64>>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Comparison of '{}' from {} to {} ({} weeks)",
            self.actual_name,
            self.window_start,
            self.window_end,
            self.rows.len()
        )?;
        for summary in &self.summaries {
            writeln!(f, "{}:", summary.name)?;
            writeln!(f, "  Total actual:    {:.1}", summary.actual_total)?;
            writeln!(f, "  Total predicted: {:.1}", summary.forecast_total)?;
            writeln!(f, "  Difference:      {:+.1}", summary.total_delta)?;
            writeln!(f, "  Weeks compared:  {}", summary.weeks_compared)?;
            if let Some(accuracy) = &summary.accuracy {
                writeln!(f, "  MAE:   {:.4}", accuracy.mae)?;
                writeln!(f, "  RMSE:  {:.4}", accuracy.rmse)?;
                writeln!(f, "  SMAPE: {:.4}%", accuracy.smape)?;
            }
        }
        Ok(())
    }
}

/// Aligns forecasts with actual counts over a fixed window
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    window_start: NaiveDate,
    window_end: NaiveDate,
}

impl Comparator {
    /// Window bounds are inclusive
    pub fn new(window_start: NaiveDate, window_end: NaiveDate) -> Result<Self> {
        if window_start > window_end {
            return Err(ForecastError::InvalidParameter(format!(
                "Comparison window starts on {} after it ends on {}",
                window_start, window_end
            )));
        }
        Ok(Self {
            window_start,
            window_end,
        })
    }

    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (self.window_start, self.window_end)
    }

    pub fn compare(&self, actual: &WeeklySeries, forecasts: &[&WeeklySeries]) -> Result<ComparisonTable> {
        let anchor = actual.anchor();
        if let Some(s) = forecasts.iter().find(|s| s.anchor() != anchor) {
            return Err(ForecastError::data_gap(
                s.name(),
                format!(
                    "weeks end on {:?} but the actual series '{}' uses {:?}",
                    s.anchor().weekday(),
                    actual.name(),
                    anchor.weekday()
                ),
            ));
        }
        let mut names: HashSet<&str> = HashSet::new();
        names.insert(actual.name());
        if let Some(s) = forecasts.iter().find(|s| !names.insert(s.name())) {
            return Err(ForecastError::DataError(format!(
                "Series name '{}' appears more than once in the comparison",
                s.name()
            )));
        }

        let actual = actual.window(self.window_start, self.window_end);
        let forecasts: Vec<WeeklySeries> = forecasts
            .iter()
            .map(|s| s.window(self.window_start, self.window_end))
            .collect();

        let mut weeks: BTreeSet<NaiveDate> = actual.weeks().into_iter().collect();
        for s in &forecasts {
            weeks.extend(s.weeks());
        }

        let rows: Vec<ComparisonRow> = weeks
            .into_iter()
            .map(|week_ending| {
                let observed = actual.get(week_ending);
                let predicted: Vec<Option<f64>> = forecasts.iter().map(|s| s.get(week_ending)).collect();
                let deltas = predicted
                    .iter()
                    .map(|p| match (p, observed) {
                        (Some(p), Some(a)) => Some(p - a),
                        _ => None,
                    })
                    .collect();
                ComparisonRow {
                    week_ending,
                    actual: observed,
                    forecasts: predicted,
                    deltas,
                }
            })
            .collect();

        let actual_total = actual.total();
        let mut summaries = Vec::with_capacity(forecasts.len());
        for (j, s) in forecasts.iter().enumerate() {
            let (paired_forecast, paired_actual): (Vec<f64>, Vec<f64>) = rows
                .iter()
                .filter_map(|r| Some((r.forecasts[j]?, r.actual?)))
                .unzip();
            let accuracy = if paired_forecast.is_empty() {
                None
            } else {
                Some(forecast_accuracy(&paired_forecast, &paired_actual)?)
            };
            let forecast_total = s.total();
            summaries.push(ForecastSummary {
                name: s.name().to_string(),
                actual_total,
                forecast_total,
                total_delta: forecast_total - actual_total,
                weeks_compared: paired_forecast.len(),
                accuracy,
            });
        }

        for summary in &summaries {
            info!(
                "'{}' vs '{}': actual {:.1}, predicted {:.1} over {} weeks",
                summary.name,
                actual.name(),
                summary.actual_total,
                summary.forecast_total,
                summary.weeks_compared
            );
        }

        Ok(ComparisonTable {
            actual_name: actual.name().to_string(),
            forecast_names: forecasts.iter().map(|s| s.name().to_string()).collect(),
            window_start: self.window_start,
            window_end: self.window_end,
            rows,
            summaries,
        })
    }
}
