//! Raw records and weekly series

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Date format used for every persisted week key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Weekday on which every week ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekAnchor {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Default for WeekAnchor {
    fn default() -> Self {
        WeekAnchor::Sunday
    }
}

impl WeekAnchor {
    /// The chrono weekday for this anchor
    pub fn weekday(self) -> Weekday {
        match self {
            WeekAnchor::Monday => Weekday::Mon,
            WeekAnchor::Tuesday => Weekday::Tue,
            WeekAnchor::Wednesday => Weekday::Wed,
            WeekAnchor::Thursday => Weekday::Thu,
            WeekAnchor::Friday => Weekday::Fri,
            WeekAnchor::Saturday => Weekday::Sat,
            WeekAnchor::Sunday => Weekday::Sun,
        }
    }

    /// Week-ending date of the week containing `date`: the first anchor day on
    /// or after it
    pub fn week_ending(self, date: NaiveDate) -> NaiveDate {
        let target = self.weekday().num_days_from_monday() as i64;
        let current = date.weekday().num_days_from_monday() as i64;
        date + Duration::days((target - current).rem_euclid(7))
    }

    /// Whether `date` falls on the anchor weekday
    pub fn is_anchor(self, date: NaiveDate) -> bool {
        date.weekday() == self.weekday()
    }
}

impl FromStr for WeekAnchor {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "monday" => Ok(WeekAnchor::Monday),
            "tue" | "tuesday" => Ok(WeekAnchor::Tuesday),
            "wed" | "wednesday" => Ok(WeekAnchor::Wednesday),
            "thu" | "thursday" => Ok(WeekAnchor::Thursday),
            "fri" | "friday" => Ok(WeekAnchor::Friday),
            "sat" | "saturday" => Ok(WeekAnchor::Saturday),
            "sun" | "sunday" => Ok(WeekAnchor::Sunday),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown week anchor '{}'",
                other
            ))),
        }
    }
}

/// A single notified case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Region (municipality) of residence
    pub region_id: String,
    /// Notification date
    pub notification_date: NaiveDate,
}

impl EventRecord {
    pub fn new(region_id: impl Into<String>, notification_date: NaiveDate) -> Self {
        Self {
            region_id: region_id.into(),
            notification_date,
        }
    }
}

/// Daily weather reading for one sub-region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateObservation {
    pub sub_region_id: String,
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub temp_mean: f64,
    pub precipitation_mm: f64,
    pub humidity: f64,
}

/// Numeric fields of a [`ClimateObservation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateField {
    TempMax,
    TempMin,
    TempMean,
    PrecipitationMm,
    Humidity,
}

impl ClimateField {
    pub const ALL: [ClimateField; 5] = [
        ClimateField::TempMax,
        ClimateField::TempMin,
        ClimateField::TempMean,
        ClimateField::PrecipitationMm,
        ClimateField::Humidity,
    ];

    /// Read this field from an observation
    pub fn value(self, obs: &ClimateObservation) -> f64 {
        match self {
            ClimateField::TempMax => obs.temp_max,
            ClimateField::TempMin => obs.temp_min,
            ClimateField::TempMean => obs.temp_mean,
            ClimateField::PrecipitationMm => obs.precipitation_mm,
            ClimateField::Humidity => obs.humidity,
        }
    }

    /// Column name of the field
    pub fn name(self) -> &'static str {
        match self {
            ClimateField::TempMax => "temp_max",
            ClimateField::TempMin => "temp_min",
            ClimateField::TempMean => "temp_mean",
            ClimateField::PrecipitationMm => "precipitation_mm",
            ClimateField::Humidity => "humidity",
        }
    }
}

impl fmt::Display for ClimateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One week of a weekly series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub week_ending: NaiveDate,
    pub value: f64,
}

/// Ordered weekly values of one signal.
///
/// Weeks are strictly ascending, unique and all fall on the series' anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySeries {
    name: String,
    anchor: WeekAnchor,
    points: Vec<WeeklyPoint>,
}

impl WeeklySeries {
    /// Create a series, validating ordering, uniqueness and anchoring
    pub fn new(name: impl Into<String>, anchor: WeekAnchor, points: Vec<WeeklyPoint>) -> Result<Self> {
        let name = name.into();

        if let Some(p) = points.iter().find(|p| !anchor.is_anchor(p.week_ending)) {
            return Err(ForecastError::data_gap(
                name,
                format!(
                    "week {} does not end on {:?}",
                    p.week_ending,
                    anchor.weekday()
                ),
            ));
        }

        if let Some(w) = points.windows(2).find(|w| w[1].week_ending <= w[0].week_ending) {
            return Err(ForecastError::data_gap(
                name,
                format!(
                    "weeks must be strictly ascending, found {} after {}",
                    w[1].week_ending, w[0].week_ending
                ),
            ));
        }

        Ok(Self {
            name,
            anchor,
            points,
        })
    }

    /// Create a contiguous series starting at `first_week`
    pub fn from_values(
        name: impl Into<String>,
        anchor: WeekAnchor,
        first_week: NaiveDate,
        values: &[f64],
    ) -> Result<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| WeeklyPoint {
                week_ending: first_week + Duration::weeks(i as i64),
                value,
            })
            .collect();
        Self::new(name, anchor, points)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn anchor(&self) -> WeekAnchor {
        self.anchor
    }

    pub fn points(&self) -> &[WeeklyPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_week(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.week_ending)
    }

    pub fn last_week(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.week_ending)
    }

    /// Values in week order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Week keys in order
    pub fn weeks(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.week_ending).collect()
    }

    /// Value of a given week, if present
    pub fn get(&self, week: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by(|p| p.week_ending.cmp(&week))
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Sum of all values
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }

    /// Whether consecutive points are exactly one week apart
    pub fn is_contiguous(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].week_ending - w[0].week_ending == Duration::weeks(1))
    }

    /// Same points under another name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Points whose week falls in `[start, end]`
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            name: self.name.clone(),
            anchor: self.anchor,
            points: self
                .points
                .iter()
                .filter(|p| p.week_ending >= start && p.week_ending <= end)
                .copied()
                .collect(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON, re-checking the series invariants
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: WeeklySeries = serde_json::from_str(json)?;
        Self::new(raw.name, raw.anchor, raw.points)
    }

    /// Two-column frame: `week_ending` (text) and the series name (f64)
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let weeks: Vec<String> = self
            .points
            .iter()
            .map(|p| p.week_ending.format(DATE_FORMAT).to_string())
            .collect();
        let values: Vec<f64> = self.values();

        Ok(DataFrame::new(vec![
            Series::new("week_ending", weeks),
            Series::new(self.name.as_str(), values),
        ])?)
    }

    /// Read a series back from a frame produced by [`WeeklySeries::to_dataframe`]
    pub fn from_dataframe(df: &DataFrame, name: &str, anchor: WeekAnchor) -> Result<Self> {
        let weeks = df.column("week_ending")?.utf8()?;
        let values = df.column(name)?.cast(&DataType::Float64)?;
        let values = values.f64()?;

        let mut points = Vec::with_capacity(df.height());
        for (week, value) in weeks.into_iter().zip(values.into_iter()) {
            let (week, value) = match (week, value) {
                (Some(w), Some(v)) => (w, v),
                _ => {
                    return Err(ForecastError::DataError(format!(
                        "Null entry in persisted series '{}'",
                        name
                    )))
                }
            };
            let week_ending = NaiveDate::parse_from_str(week, DATE_FORMAT).map_err(|e| {
                ForecastError::DataError(format!("Invalid week '{}': {}", week, e))
            })?;
            points.push(WeeklyPoint { week_ending, value });
        }

        Self::new(name, anchor, points)
    }

    /// Write the series as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
        Ok(())
    }

    /// Read a series written by [`WeeklySeries::write_csv`]
    pub fn read_csv<P: AsRef<Path>>(path: P, name: &str, anchor: WeekAnchor) -> Result<Self> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;
        Self::from_dataframe(&df, name, anchor)
    }
}

/// Loader for externally materialised records
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load notifications from a CSV with `region_id,notification_date` columns
    pub fn events_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
        let file = File::open(path)?;
        Self::events_from_reader(file)
    }

    /// Load notifications from any CSV reader
    pub fn events_from_reader<R: Read>(reader: R) -> Result<Vec<EventRecord>> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut events = Vec::new();
        for record in rdr.deserialize() {
            events.push(record?);
        }
        log::info!("Loaded {} event records", events.len());
        Ok(events)
    }

    /// Load daily climate readings from a CSV with one column per field
    pub fn climate_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ClimateObservation>> {
        let file = File::open(path)?;
        Self::climate_from_reader(file)
    }

    /// Load daily climate readings from any CSV reader
    pub fn climate_from_reader<R: Read>(reader: R) -> Result<Vec<ClimateObservation>> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut observations = Vec::new();
        for record in rdr.deserialize() {
            observations.push(record?);
        }
        log::info!("Loaded {} climate observations", observations.len());
        Ok(observations)
    }
}
