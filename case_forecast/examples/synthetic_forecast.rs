use case_forecast::config::PipelineConfig;
use case_forecast::models::{BoostingParams, ModelKind};
use case_forecast::pipeline::{Pipeline, Variant};
use case_forecast::synthetic::{ClimateGenerator, EventGenerator};
use chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).ok_or("invalid start date")?;
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).ok_or("invalid end date")?;

    // Generate six years of notifications and weather for one region
    let regions = vec!["260290".to_string(), "260410".to_string()];
    let events = EventGenerator {
        regions: regions.clone(),
        start,
        end,
        daily_rate: 4.0,
        seasonal_amplitude: 0.7,
        peak_day: 160,
        spikes: Vec::new(),
        seed: 7,
    }
    .generate()?;
    let climate = ClimateGenerator::new(regions, start, end, 7).generate()?;
    println!("Generated {} notifications", events.len());

    // A smaller ensemble keeps the example quick
    let mut config = PipelineConfig::default();
    config.training.model = ModelKind::GradientBoosting(BoostingParams {
        n_estimators: 200,
        learning_rate: 0.05,
        ..BoostingParams::default()
    });

    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(Variant::WithClimate, &events, &climate)?;

    println!(
        "Trained {} on {} rows",
        output.outcome.artifact.name(),
        output.outcome.artifact.training_rows()
    );
    println!("Forecast for the first 8 weeks after the cutoff:");
    for step in output.forecast.steps.iter().take(8) {
        println!(
            "Week ending {}: {:.1} (raw {:.2})",
            step.week_ending, step.prediction, step.raw_prediction
        );
    }
    println!("Total forecast: {:.1}", output.forecast.series.total());

    Ok(())
}
