//! Joining weekly signals and deriving lagged feature rows

use crate::data::{WeekAnchor, WeeklyPoint, WeeklySeries, DATE_FORMAT};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::Path;
use weekly_math::seasonality::week_of_year_encoding;

/// Lag structure of the feature rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagConfig {
    /// Offsets (in weeks) of the autoregressive lags
    pub target_lags: Vec<usize>,
    /// Offsets (in weeks) applied to every exogenous signal
    pub exogenous_lags: Vec<usize>,
    /// Exogenous series to lag, by name
    pub exogenous_signals: Vec<String>,
}

impl Default for LagConfig {
    fn default() -> Self {
        Self {
            target_lags: vec![1, 2, 4, 8],
            // vector breeding delay: rain this week shows up as cases weeks later
            exogenous_lags: vec![2, 3, 4, 8],
            exogenous_signals: vec![
                "precipitation_mm".to_string(),
                "temp_mean".to_string(),
                "humidity".to_string(),
            ],
        }
    }
}

impl LagConfig {
    /// Same autoregressive lags without any exogenous signal
    pub fn autoregressive_only(&self) -> Self {
        Self {
            exogenous_signals: Vec::new(),
            ..self.clone()
        }
    }

    /// Largest autoregressive offset
    pub fn max_target_lag(&self) -> usize {
        self.target_lags.iter().copied().max().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_lags.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one autoregressive lag is required".to_string(),
            ));
        }
        check_offsets("target_lags", &self.target_lags)?;
        if !self.exogenous_signals.is_empty() {
            if self.exogenous_lags.is_empty() {
                return Err(ForecastError::InvalidParameter(
                    "Exogenous signals were given without exogenous lags".to_string(),
                ));
            }
            check_offsets("exogenous_lags", &self.exogenous_lags)?;
        }
        let unique: HashSet<&String> = self.exogenous_signals.iter().collect();
        if unique.len() != self.exogenous_signals.len() {
            return Err(ForecastError::InvalidParameter(
                "Exogenous signal names must be unique".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_offsets(label: &str, offsets: &[usize]) -> Result<()> {
    if offsets.iter().any(|&k| k == 0) {
        return Err(ForecastError::InvalidParameter(format!(
            "{} must be strictly positive, same-week values are not predictors",
            label
        )));
    }
    let unique: BTreeSet<usize> = offsets.iter().copied().collect();
    if unique.len() != offsets.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "{} contains duplicate offsets",
            label
        )));
    }
    Ok(())
}

/// One week of the joined signals
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedWeek {
    pub week_ending: NaiveDate,
    /// Target value, 0 when the target series has no entry for the week
    pub target: f64,
    /// One value per exogenous signal, `None` where the signal has a gap
    pub exogenous: Vec<Option<f64>>,
}

/// Target and exogenous series outer-joined on week-ending date
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedSeries {
    target_name: String,
    exogenous_names: Vec<String>,
    anchor: WeekAnchor,
    weeks: Vec<UnifiedWeek>,
}

impl UnifiedSeries {
    /// Outer join on week-ending date. The union of weeks must be contiguous.
    pub fn join(target: &WeeklySeries, exogenous: &[WeeklySeries]) -> Result<Self> {
        let anchor = target.anchor();
        if let Some(s) = exogenous.iter().find(|s| s.anchor() != anchor) {
            return Err(ForecastError::data_gap(
                s.name(),
                format!(
                    "weeks end on {:?} but the target '{}' uses {:?}",
                    s.anchor().weekday(),
                    target.name(),
                    anchor.weekday()
                ),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        names.insert(target.name());
        if let Some(s) = exogenous.iter().find(|s| !names.insert(s.name())) {
            return Err(ForecastError::DataError(format!(
                "Signal name '{}' appears more than once in the join",
                s.name()
            )));
        }

        let mut all_weeks: BTreeSet<NaiveDate> = target.weeks().into_iter().collect();
        for s in exogenous {
            all_weeks.extend(s.weeks());
        }
        let all_weeks: Vec<NaiveDate> = all_weeks.into_iter().collect();

        if all_weeks.is_empty() {
            return Err(ForecastError::data_gap(target.name(), "no weeks in any input series"));
        }
        if let Some(w) = all_weeks.windows(2).find(|w| w[1] - w[0] != Duration::weeks(1)) {
            return Err(ForecastError::data_gap(
                target.name(),
                format!("joined series has no week between {} and {}", w[0], w[1]),
            ));
        }

        let weeks = all_weeks
            .iter()
            .map(|&week_ending| UnifiedWeek {
                week_ending,
                target: target.get(week_ending).unwrap_or(0.0),
                exogenous: exogenous.iter().map(|s| s.get(week_ending)).collect(),
            })
            .collect();

        Ok(Self {
            target_name: target.name().to_string(),
            exogenous_names: exogenous.iter().map(|s| s.name().to_string()).collect(),
            anchor,
            weeks,
        })
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn exogenous_names(&self) -> &[String] {
        &self.exogenous_names
    }

    pub fn anchor(&self) -> WeekAnchor {
        self.anchor
    }

    pub fn weeks(&self) -> &[UnifiedWeek] {
        &self.weeks
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn first_week(&self) -> Option<NaiveDate> {
        self.weeks.first().map(|w| w.week_ending)
    }

    pub fn last_week(&self) -> Option<NaiveDate> {
        self.weeks.last().map(|w| w.week_ending)
    }

    /// Position of an exogenous signal in every week's `exogenous` vector
    pub fn exogenous_index(&self, name: &str) -> Option<usize> {
        self.exogenous_names.iter().position(|n| n == name)
    }

    /// The joined target column as a weekly series
    pub fn target_series(&self) -> Result<WeeklySeries> {
        let points = self
            .weeks
            .iter()
            .map(|w| WeeklyPoint {
                week_ending: w.week_ending,
                value: w.target,
            })
            .collect();
        WeeklySeries::new(self.target_name.clone(), self.anchor, points)
    }
}

/// Ordered feature columns a model is trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub target: String,
    pub target_lags: Vec<usize>,
    pub exogenous_signals: Vec<String>,
    pub exogenous_lags: Vec<usize>,
}

impl FeatureSchema {
    pub fn new(target: impl Into<String>, config: &LagConfig) -> Self {
        Self {
            target: target.into(),
            target_lags: config.target_lags.clone(),
            exogenous_signals: config.exogenous_signals.clone(),
            exogenous_lags: if config.exogenous_signals.is_empty() {
                Vec::new()
            } else {
                config.exogenous_lags.clone()
            },
        }
    }

    /// Column names in row-vector order
    pub fn names(&self) -> Vec<String> {
        let mut names = vec!["week_sin".to_string(), "week_cos".to_string()];
        names.extend(self.target_lags.iter().map(|k| lag_name(&self.target, *k)));
        for signal in &self.exogenous_signals {
            names.extend(self.exogenous_lags.iter().map(|k| lag_name(signal, *k)));
        }
        names
    }

    /// Number of columns in a row vector
    pub fn width(&self) -> usize {
        2 + self.target_lags.len() + self.exogenous_signals.len() * self.exogenous_lags.len()
    }

    pub fn max_target_lag(&self) -> usize {
        self.target_lags.iter().copied().max().unwrap_or(0)
    }

    /// Fail with the differing columns when `other` is not this schema
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self == other {
            return Ok(());
        }
        let ours = self.names();
        let theirs = other.names();
        let missing: Vec<String> = ours.iter().filter(|n| !theirs.contains(n)).cloned().collect();
        let unexpected: Vec<String> = theirs.iter().filter(|n| !ours.contains(n)).cloned().collect();
        // Same columns under a different order still cannot be fed to the model
        let (missing, unexpected) = if missing.is_empty() && unexpected.is_empty() {
            (ours, theirs)
        } else {
            (missing, unexpected)
        };
        Err(ForecastError::FeatureMismatch {
            missing,
            unexpected,
        })
    }
}

fn lag_name(signal: &str, k: usize) -> String {
    format!("lag_{}_w{}", signal, k)
}

/// Feature vector of one week
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub week_ending: NaiveDate,
    /// ISO week number of `week_ending`
    pub week_of_year: u32,
    /// `[sin, cos]` of the week of year
    pub calendar: [f64; 2],
    /// Target values at each autoregressive offset
    pub target_lags: Vec<f64>,
    /// Exogenous values, signal-major then offset
    pub exogenous_lags: Vec<f64>,
    /// Known target; `None` for forecast rows
    pub target: Option<f64>,
}

impl FeatureRow {
    /// Flatten into the schema's column order
    pub fn to_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(2 + self.target_lags.len() + self.exogenous_lags.len());
        v.extend_from_slice(&self.calendar);
        v.extend_from_slice(&self.target_lags);
        v.extend_from_slice(&self.exogenous_lags);
        v
    }
}

/// Ordered feature rows sharing one schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(schema: FeatureSchema, rows: Vec<FeatureRow>) -> Result<Self> {
        if let Some(row) = rows
            .iter()
            .find(|r| r.target_lags.len() + r.exogenous_lags.len() + 2 != schema.width())
        {
            return Err(ForecastError::DataError(format!(
                "Row for week {} does not match a schema of {} columns",
                row.week_ending,
                schema.width()
            )));
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows strictly before `cutoff` with a known target
    pub fn training_rows(&self, cutoff: NaiveDate) -> Vec<&FeatureRow> {
        self.rows
            .iter()
            .filter(|r| r.week_ending < cutoff && r.target.is_some())
            .collect()
    }

    /// Rows from `cutoff` (inclusive) up to `end` (inclusive), with the
    /// target removed
    pub fn horizon(&self, cutoff: NaiveDate, end: Option<NaiveDate>) -> FeatureTable {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.week_ending >= cutoff && end.map_or(true, |e| r.week_ending <= e))
            .map(|r| FeatureRow {
                target: None,
                ..r.clone()
            })
            .collect();
        FeatureTable {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Frame with `week_ending`, `week_of_year`, one column per feature and
    /// the nullable target
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let names = self.schema.names();
        let vectors: Vec<Vec<f64>> = self.rows.iter().map(|r| r.to_vector()).collect();

        let mut columns = Vec::with_capacity(names.len() + 3);
        columns.push(Series::new(
            "week_ending",
            self.rows
                .iter()
                .map(|r| r.week_ending.format(DATE_FORMAT).to_string())
                .collect::<Vec<String>>(),
        ));
        columns.push(Series::new(
            "week_of_year",
            self.rows.iter().map(|r| r.week_of_year).collect::<Vec<u32>>(),
        ));
        for (j, name) in names.iter().enumerate() {
            columns.push(Series::new(
                name.as_str(),
                vectors.iter().map(|v| v[j]).collect::<Vec<f64>>(),
            ));
        }
        columns.push(Series::new(
            self.schema.target.as_str(),
            self.rows.iter().map(|r| r.target).collect::<Vec<Option<f64>>>(),
        ));

        Ok(DataFrame::new(columns)?)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }

    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let file = File::create(path)?;
        ParquetWriter::new(file).finish(&mut df)?;
        Ok(())
    }
}

/// Derives calendar and lag features from a unified series
#[derive(Debug, Clone)]
pub struct FeatureSynthesizer {
    config: LagConfig,
}

impl FeatureSynthesizer {
    pub fn new(config: LagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LagConfig {
        &self.config
    }

    /// Outer join of the target with the exogenous series
    pub fn join(&self, target: &WeeklySeries, exogenous: &[WeeklySeries]) -> Result<UnifiedSeries> {
        UnifiedSeries::join(target, exogenous)
    }

    /// Build one row per week whose every lag resolves to observed history.
    /// Rows that would need history before the series starts, or a lagged
    /// exogenous value that is missing, are dropped.
    pub fn synthesize(&self, unified: &UnifiedSeries) -> Result<FeatureTable> {
        let missing: Vec<String> = self
            .config
            .exogenous_signals
            .iter()
            .filter(|s| unified.exogenous_index(s).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::FeatureMismatch {
                missing,
                unexpected: Vec::new(),
            });
        }
        let signal_indices: Vec<usize> = self
            .config
            .exogenous_signals
            .iter()
            .filter_map(|s| unified.exogenous_index(s))
            .collect();

        let schema = FeatureSchema::new(unified.target_name(), &self.config);
        let weeks = unified.weeks();
        let warm_up = self
            .config
            .max_target_lag()
            .max(if signal_indices.is_empty() {
                0
            } else {
                self.config.exogenous_lags.iter().copied().max().unwrap_or(0)
            });

        let mut rows = Vec::with_capacity(weeks.len().saturating_sub(warm_up));
        let mut gap_drops = 0usize;

        'weeks: for (i, week) in weeks.iter().enumerate() {
            if i < warm_up {
                continue;
            }

            let target_lags: Vec<f64> = self
                .config
                .target_lags
                .iter()
                .map(|&k| weeks[i - k].target)
                .collect();

            let mut exogenous_lags = Vec::with_capacity(schema.width());
            for &s in &signal_indices {
                for &k in &self.config.exogenous_lags {
                    debug_assert_eq!(
                        weeks[i - k].week_ending,
                        week.week_ending - Duration::weeks(k as i64)
                    );
                    match weeks[i - k].exogenous[s] {
                        Some(v) => exogenous_lags.push(v),
                        None => {
                            gap_drops += 1;
                            continue 'weeks;
                        }
                    }
                }
            }

            let week_of_year = week.week_ending.iso_week().week();
            let (sin, cos) = week_of_year_encoding(week_of_year);
            rows.push(FeatureRow {
                week_ending: week.week_ending,
                week_of_year,
                calendar: [sin, cos],
                target_lags,
                exogenous_lags,
                target: Some(week.target),
            });
        }

        if gap_drops > 0 {
            warn!(
                "Dropped {} rows of '{}' whose lagged climate values are missing",
                gap_drops,
                unified.target_name()
            );
        }
        info!(
            "Synthesized {} feature rows ({} columns) from {} weeks; {} warm-up weeks dropped",
            rows.len(),
            schema.width(),
            weeks.len(),
            warm_up.min(weeks.len())
        );

        FeatureTable::new(schema, rows)
    }
}
