//! Temporal aggregation of event and climate records into weekly series

use crate::data::{ClimateField, ClimateObservation, EventRecord, WeekAnchor, WeeklyPoint, WeeklySeries};
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use weekly_math::{Accumulator, Reducer};

/// Settings shared by every signal in one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Weekday on which weeks end
    pub anchor: WeekAnchor,
    /// Region codes to keep; `None` keeps every region
    pub region_codes: Option<BTreeSet<String>>,
    /// First day to keep (inclusive)
    pub start: Option<NaiveDate>,
    /// Last day to keep (inclusive)
    pub end: Option<NaiveDate>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            anchor: WeekAnchor::Sunday,
            region_codes: None,
            start: None,
            end: None,
        }
    }
}

impl AggregationConfig {
    fn keeps_region(&self, region: &str) -> bool {
        self.region_codes
            .as_ref()
            .map_or(true, |codes| codes.contains(region.trim()))
    }

    fn keeps_date(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// How one climate field is reduced to a weekly value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: ClimateField,
    pub reducer: Reducer,
    /// Name of the produced weekly series
    pub name: String,
}

impl FieldRule {
    pub fn new(field: ClimateField, reducer: Reducer) -> Self {
        Self {
            field,
            reducer,
            name: field.name().to_string(),
        }
    }

    /// Weekly max of daily maxima, min of minima, mean temperature, total
    /// rainfall and mean humidity
    pub fn defaults() -> Vec<FieldRule> {
        vec![
            FieldRule::new(ClimateField::TempMax, Reducer::Max),
            FieldRule::new(ClimateField::TempMin, Reducer::Min),
            FieldRule::new(ClimateField::TempMean, Reducer::Mean),
            FieldRule::new(ClimateField::PrecipitationMm, Reducer::Sum),
            FieldRule::new(ClimateField::Humidity, Reducer::Mean),
        ]
    }
}

/// Collapses irregular daily records into gap-free weekly series
#[derive(Debug, Clone)]
pub struct TemporalAggregator {
    config: AggregationConfig,
}

impl TemporalAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Count qualifying events per week. Weeks without events are present
    /// with value 0.
    pub fn count_events(&self, events: &[EventRecord], name: &str) -> Result<WeeklySeries> {
        let anchor = self.config.anchor;
        let mut counts: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut kept = 0usize;

        for event in events {
            if !self.config.keeps_region(&event.region_id)
                || !self.config.keeps_date(event.notification_date)
            {
                continue;
            }
            *counts.entry(anchor.week_ending(event.notification_date)).or_insert(0.0) += 1.0;
            kept += 1;
        }

        let first = counts.keys().next().copied();
        let last = counts.keys().next_back().copied();
        let first = match (first, self.config.start) {
            (Some(f), Some(s)) => Some(f.min(anchor.week_ending(s))),
            (f, s) => f.or_else(|| s.map(|s| anchor.week_ending(s))),
        };
        let last = match (last, self.config.end) {
            (Some(l), Some(e)) => Some(l.max(anchor.week_ending(e))),
            (l, e) => l.or_else(|| e.map(|e| anchor.week_ending(e))),
        };

        let (first, last) = match (first, last) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                return Err(ForecastError::data_gap(
                    name,
                    format!(
                        "none of the {} event records matched the region and date filters",
                        events.len()
                    ),
                ))
            }
        };

        let points: Vec<WeeklyPoint> = week_range(first, last)
            .map(|week_ending| WeeklyPoint {
                week_ending,
                value: counts.get(&week_ending).copied().unwrap_or(0.0),
            })
            .collect();

        info!(
            "Aggregated {} of {} events into {} weeks of '{}' ({} to {})",
            kept,
            events.len(),
            points.len(),
            name,
            first,
            last
        );

        WeeklySeries::new(name, anchor, points)
    }

    /// Reduce daily climate readings to one weekly series per rule.
    ///
    /// Readings are first averaged over sub-regions per day, then reduced
    /// per week with the rule's reducer.
    pub fn aggregate_climate(
        &self,
        observations: &[ClimateObservation],
        rules: &[FieldRule],
    ) -> Result<Vec<WeeklySeries>> {
        if rules.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one climate field rule is required".to_string(),
            ));
        }

        let daily = self.regional_daily_means(observations)?;
        let anchor = self.config.anchor;

        let mut weekly: BTreeMap<NaiveDate, Vec<Accumulator>> = BTreeMap::new();
        for (date, means) in &daily {
            let accs = weekly
                .entry(anchor.week_ending(*date))
                .or_insert_with(|| rules.iter().map(|r| Accumulator::new(r.reducer)).collect());
            for (acc, rule) in accs.iter_mut().zip(rules) {
                acc.update(means[field_index(rule.field)]);
            }
        }

        let (first, last) = match (weekly.keys().next(), weekly.keys().next_back()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => {
                return Err(ForecastError::data_gap(
                    "climate",
                    "no observations matched the region and date filters",
                ))
            }
        };

        let mut series: Vec<Vec<WeeklyPoint>> = vec![Vec::new(); rules.len()];
        for week_ending in week_range(first, last) {
            let accs = weekly.get(&week_ending).ok_or_else(|| {
                ForecastError::data_gap(
                    "climate",
                    format!("week ending {} has no observations", week_ending),
                )
            })?;
            for (i, acc) in accs.iter().enumerate() {
                let value = acc.value().ok_or_else(|| {
                    ForecastError::data_gap(
                        rules[i].name.as_str(),
                        format!("week ending {} has no value", week_ending),
                    )
                })?;
                series[i].push(WeeklyPoint { week_ending, value });
            }
        }

        info!(
            "Aggregated {} regional days into {} climate weeks ({} to {}) for {} fields",
            daily.len(),
            series.first().map_or(0, |s| s.len()),
            first,
            last,
            rules.len()
        );

        rules
            .iter()
            .zip(series)
            .map(|(rule, points)| WeeklySeries::new(rule.name.clone(), anchor, points))
            .collect()
    }

    /// Spatial stage: mean of every field over the sub-regions of each day
    fn regional_daily_means(
        &self,
        observations: &[ClimateObservation],
    ) -> Result<BTreeMap<NaiveDate, [f64; 5]>> {
        let mut by_day: BTreeMap<NaiveDate, BTreeMap<&str, &ClimateObservation>> = BTreeMap::new();

        for obs in observations {
            let region = obs.sub_region_id.trim();
            if !self.config.keeps_region(region) || !self.config.keeps_date(obs.date) {
                continue;
            }
            if by_day.entry(obs.date).or_default().insert(region, obs).is_some() {
                return Err(ForecastError::data_gap(
                    "climate",
                    format!("duplicate observation for sub-region {} on {}", region, obs.date),
                ));
            }
        }

        let expected: Option<BTreeSet<&str>> = by_day
            .values()
            .next()
            .map(|regions| regions.keys().copied().collect());

        let mut daily = BTreeMap::new();
        for (date, regions) in &by_day {
            let keys: BTreeSet<&str> = regions.keys().copied().collect();
            if Some(&keys) != expected.as_ref() {
                return Err(ForecastError::data_gap(
                    "climate",
                    format!(
                        "inconsistent sub-region keys on {}: expected {:?}, found {:?}",
                        date,
                        expected.as_ref().map(|e| e.iter().collect::<Vec<_>>()),
                        keys.iter().collect::<Vec<_>>()
                    ),
                ));
            }

            let n = regions.len() as f64;
            let mut means = [0.0; 5];
            for obs in regions.values() {
                for field in ClimateField::ALL {
                    means[field_index(field)] += field.value(obs);
                }
            }
            means.iter_mut().for_each(|m| *m /= n);
            daily.insert(*date, means);
        }

        debug!(
            "Averaged {} sub-regions over {} days",
            expected.map_or(0, |e| e.len()),
            daily.len()
        );
        Ok(daily)
    }
}

fn field_index(field: ClimateField) -> usize {
    match field {
        ClimateField::TempMax => 0,
        ClimateField::TempMin => 1,
        ClimateField::TempMean => 2,
        ClimateField::PrecipitationMm => 3,
        ClimateField::Humidity => 4,
    }
}

/// Every week-ending date from `first` to `last` inclusive
pub(crate) fn week_range(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(first), |w| Some(*w + Duration::weeks(1))).take_while(move |w| *w <= last)
}
