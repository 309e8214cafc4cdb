//! casecast CLI entry point.
//!
//! Trains the autoregressive and climate-aware variants, forecasts the
//! weeks after the cutoff and compares both with the observed cases.

use case_forecast::config::{PipelineConfig, DEFAULT_REGION_CODES};
use case_forecast::data::DataLoader;
use case_forecast::pipeline::{ComparisonReport, Pipeline};
use case_forecast::synthetic::{ClimateGenerator, EventGenerator, Spike};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "casecast")]
#[command(version = VERSION)]
#[command(about = "Weekly case forecasting with lagged climate covariates", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run both variants on notification and climate CSV files
    Run {
        /// Notifications CSV (region_id, notification_date)
        #[arg(long)]
        cases: PathBuf,

        /// Daily climate CSV (sub_region_id, date, temp_max, temp_min, temp_mean, precipitation_mm, humidity)
        #[arg(long)]
        climate: PathBuf,

        /// TOML configuration; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory receiving the CSV outputs
        #[arg(short, long, default_value = "casecast_output")]
        output: PathBuf,
    },

    /// Run both variants on seeded synthetic data
    Demo {
        /// TOML configuration; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed of the synthetic generators
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Directory receiving the CSV outputs
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            PipelineConfig::from_file(path)?
        }
        None => PipelineConfig::default(),
    })
}

fn print_report(report: &ComparisonReport) {
    println!("{}", report.table);
    for output in [&report.autoregressive, &report.with_climate] {
        println!("Top features of the {} variant:", output.variant);
        for feature in output.outcome.importance.iter().take(5) {
            println!("  {:<28} {:.3}", feature.feature, feature.score);
        }
    }
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| format!("invalid date {}-{}-{}", year, month, day).into())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Initialize logger
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    log::info!("casecast {} - Starting", VERSION);

    match cli.command {
        Command::Run {
            cases,
            climate,
            config,
            output,
        } => {
            let pipeline = Pipeline::new(load_config(config.as_ref())?)?;
            let events = DataLoader::events_from_csv(&cases)?;
            let observations = DataLoader::climate_from_csv(&climate)?;

            let report = pipeline.run_comparison(&events, &observations)?;
            print_report(&report);
            report.write_csv(&output)?;
        }
        Command::Demo { config, seed, output } => {
            let pipeline = Pipeline::new(load_config(config.as_ref())?)?;
            let regions: Vec<String> = DEFAULT_REGION_CODES.iter().map(|c| c.to_string()).collect();
            let start = date(2019, 1, 1)?;
            let end = date(2024, 12, 31)?;

            let events = EventGenerator {
                regions: regions.clone(),
                start,
                end,
                daily_rate: 6.0,
                seasonal_amplitude: 0.8,
                peak_day: 170,
                spikes: vec![
                    Spike {
                        date: date(2022, 5, 10)?,
                        cases: 120,
                    },
                    Spike {
                        date: date(2024, 4, 16)?,
                        cases: 150,
                    },
                ],
                seed,
            }
            .generate()?;
            let observations = ClimateGenerator::new(regions.into_iter().take(5).collect(), start, end, seed).generate()?;
            log::info!(
                "Generated {} notifications and {} climate readings",
                events.len(),
                observations.len()
            );

            let report = pipeline.run_comparison(&events, &observations)?;
            print_report(&report);
            if let Some(output) = output {
                report.write_csv(&output)?;
            }
        }
        Command::Config => {
            print!("{}", PipelineConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}
