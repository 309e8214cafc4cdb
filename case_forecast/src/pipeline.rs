//! Stage orchestration: aggregate, synthesize, train, forecast, compare

use crate::aggregate::TemporalAggregator;
use crate::compare::{ComparisonTable, Comparator};
use crate::config::PipelineConfig;
use crate::data::{ClimateObservation, EventRecord, WeeklySeries};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureSynthesizer, FeatureTable, LagConfig, UnifiedSeries};
use crate::forecast::{ForecastOutput, ForecastState, RecursiveForecaster};
use crate::train::{ModelTrainer, TrainingOutcome};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which covariates a model sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Calendar and case lags only
    Autoregressive,
    /// Calendar, case lags and lagged climate
    WithClimate,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Autoregressive, Variant::WithClimate];

    pub fn label(self) -> &'static str {
        match self {
            Variant::Autoregressive => "autoregressive",
            Variant::WithClimate => "with_climate",
        }
    }

    /// Lag structure of this variant given the configured one
    pub fn lag_config(self, configured: &LagConfig) -> LagConfig {
        match self {
            Variant::Autoregressive => configured.autoregressive_only(),
            Variant::WithClimate => configured.clone(),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Everything one variant produced
#[derive(Debug)]
pub struct PipelineOutput {
    pub variant: Variant,
    pub unified: UnifiedSeries,
    pub feature_table: FeatureTable,
    pub outcome: TrainingOutcome,
    pub forecast: ForecastOutput,
}

/// Both variants aligned against the observed cases
#[derive(Debug)]
pub struct ComparisonReport {
    pub actual: WeeklySeries,
    pub autoregressive: PipelineOutput,
    pub with_climate: PipelineOutput,
    pub table: ComparisonTable,
}

impl ComparisonReport {
    /// Write feature tables, forecasts and the comparison as CSV into `dir`
    pub fn write_csv<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        self.actual.write_csv(dir.join(format!("{}_weekly.csv", self.actual.name())))?;
        for output in [&self.autoregressive, &self.with_climate] {
            output
                .feature_table
                .write_csv(dir.join(format!("features_{}.csv", output.variant.label())))?;
            output
                .forecast
                .series
                .write_csv(dir.join(format!("forecast_{}.csv", output.variant.label())))?;
        }
        self.table.write_csv(dir.join("comparison.csv"))?;
        info!("Wrote pipeline outputs to {}", dir.display());
        Ok(())
    }
}

/// Runs the stages for one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Weekly case counts of the configured regions
    pub fn weekly_cases(&self, events: &[EventRecord]) -> Result<WeeklySeries> {
        TemporalAggregator::new(self.config.aggregation.clone())
            .count_events(events, &self.config.features.target_name)
    }

    /// Weekly climate series, one per configured rule
    pub fn weekly_climate(&self, climate: &[ClimateObservation]) -> Result<Vec<WeeklySeries>> {
        TemporalAggregator::new(self.config.aggregation.clone())
            .aggregate_climate(climate, &self.config.features.climate)
    }

    /// Run one variant from raw records
    pub fn run(
        &self,
        variant: Variant,
        events: &[EventRecord],
        climate: &[ClimateObservation],
    ) -> Result<PipelineOutput> {
        let cases = self.weekly_cases(events)?;
        let weekly_climate = match variant {
            Variant::Autoregressive => Vec::new(),
            Variant::WithClimate => self.weekly_climate(climate)?,
        };
        self.run_weekly(variant, &cases, &weekly_climate)
    }

    /// Run one variant from already aggregated weekly series
    pub fn run_weekly(
        &self,
        variant: Variant,
        cases: &WeeklySeries,
        climate: &[WeeklySeries],
    ) -> Result<PipelineOutput> {
        info!("Running the {} variant", variant);

        let synthesizer = FeatureSynthesizer::new(variant.lag_config(&self.config.features.lags))?;
        let exogenous: &[WeeklySeries] = match variant {
            Variant::Autoregressive => &[],
            Variant::WithClimate => climate,
        };
        let unified = synthesizer.join(cases, exogenous)?;
        let feature_table = synthesizer.synthesize(&unified)?;

        let trainer = ModelTrainer::new(self.config.training.clone())?;
        let outcome = trainer.fit(&feature_table)?;

        let cutoff = self.config.training.cutoff;
        let horizon = feature_table.horizon(cutoff, self.config.comparison.horizon_end);
        if horizon.is_empty() {
            return Err(ForecastError::data_gap(
                unified.target_name(),
                format!("no feature rows to forecast on or after {}", cutoff),
            ));
        }

        let mut state = ForecastState::from_unified(&unified, cutoff, feature_table.schema().max_target_lag())?;
        let forecast = RecursiveForecaster::new(&outcome.artifact, unified.anchor())
            .with_name(format!("{}_forecast_{}", unified.target_name(), variant.label()))
            .forecast(&horizon, &mut state)?;

        Ok(PipelineOutput {
            variant,
            unified,
            feature_table,
            outcome,
            forecast,
        })
    }

    /// Run both variants and compare them with the observed cases
    pub fn run_comparison(
        &self,
        events: &[EventRecord],
        climate: &[ClimateObservation],
    ) -> Result<ComparisonReport> {
        let actual = self.weekly_cases(events)?;
        let weekly_climate = self.weekly_climate(climate)?;

        let autoregressive = self.run_weekly(Variant::Autoregressive, &actual, &weekly_climate)?;
        let with_climate = self.run_weekly(Variant::WithClimate, &actual, &weekly_climate)?;

        let comparison = &self.config.comparison;
        let table = Comparator::new(comparison.window_start, comparison.window_end)?.compare(
            &actual,
            &[&autoregressive.forecast.series, &with_climate.forecast.series],
        )?;

        Ok(ComparisonReport {
            actual,
            autoregressive,
            with_climate,
            table,
        })
    }
}
