use case_forecast::config::{PipelineConfig, DEFAULT_REGION_CODES};
use case_forecast::data::{ClimateField, WeekAnchor};
use case_forecast::error::ForecastError;
use case_forecast::models::{LinearParams, ModelKind};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use weekly_math::Reducer;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn test_defaults_match_the_regional_study() {
    let config = PipelineConfig::default();

    let codes = config.aggregation.region_codes.as_ref().unwrap();
    assert_eq!(codes.len(), 20);
    assert!(DEFAULT_REGION_CODES.iter().all(|c| codes.contains(*c)));
    assert_eq!(config.aggregation.anchor, WeekAnchor::Sunday);
    assert_eq!(config.aggregation.start, Some(date("2019-01-01")));
    assert_eq!(config.aggregation.end, Some(date("2024-12-31")));

    assert_eq!(config.features.target_name, "cases");
    assert_eq!(config.features.lags.target_lags, vec![1, 2, 4, 8]);
    assert_eq!(config.features.lags.exogenous_lags, vec![2, 3, 4, 8]);
    assert_eq!(config.features.climate.len(), 5);

    assert_eq!(config.training.cutoff, date("2024-01-01"));
    assert!(matches!(config.training.model, ModelKind::GradientBoosting(_)));
    assert_eq!(config.comparison.window_start, date("2024-01-01"));
    assert_eq!(config.comparison.window_end, date("2024-12-31"));

    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_document_gives_defaults() {
    let config = PipelineConfig::from_toml_str("").unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn test_partial_document_overrides_sections() {
    let toml = r#"
        [aggregation]
        anchor = "saturday"
        region_codes = ["260290", "260410"]
        start = "2020-01-01"

        [features]
        target_name = "dengue"

        [features.lags]
        target_lags = [1, 2]
        exogenous_lags = [3]
        exogenous_signals = ["rain"]

        [[features.climate]]
        field = "precipitation_mm"
        reducer = "sum"
        name = "rain"

        [training]
        cutoff = "2023-07-01"
        min_rows = 20

        [training.model]
        kind = "linear"
        ridge = 0.25

        [comparison]
        window_start = "2023-07-01"
        window_end = "2023-12-31"
        horizon_end = "2023-10-01"
    "#;

    let config = PipelineConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.aggregation.anchor, WeekAnchor::Saturday);
    assert_eq!(config.aggregation.region_codes.as_ref().unwrap().len(), 2);
    assert_eq!(config.aggregation.end, None);

    assert_eq!(config.features.target_name, "dengue");
    assert_eq!(config.features.lags.target_lags, vec![1, 2]);
    assert_eq!(config.features.climate.len(), 1);
    assert_eq!(config.features.climate[0].field, ClimateField::PrecipitationMm);
    assert_eq!(config.features.climate[0].reducer, Reducer::Sum);

    assert_eq!(config.training.cutoff, date("2023-07-01"));
    assert_eq!(config.training.min_rows, 20);
    assert_eq!(config.training.model, ModelKind::Linear(LinearParams { ridge: 0.25 }));
    assert_eq!(config.comparison.horizon_end, Some(date("2023-10-01")));
}

#[test]
fn test_signal_without_climate_rule_is_rejected() {
    let toml = r#"
        [features.lags]
        exogenous_signals = ["wind_speed"]
    "#;
    match PipelineConfig::from_toml_str(toml) {
        Err(ForecastError::Config(message)) => assert!(message.contains("wind_speed")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_inconsistent_windows_are_rejected() {
    let reversed = r#"
        [comparison]
        window_start = "2024-12-31"
        window_end = "2024-01-01"
    "#;
    assert!(matches!(
        PipelineConfig::from_toml_str(reversed),
        Err(ForecastError::Config(_))
    ));

    let early_horizon = r#"
        [comparison]
        horizon_end = "2023-06-01"
    "#;
    assert!(matches!(
        PipelineConfig::from_toml_str(early_horizon),
        Err(ForecastError::Config(_))
    ));

    let mut config = PipelineConfig::default();
    config.aggregation.region_codes = Some(Default::default());
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_model_parameters_are_rejected() {
    let toml = r#"
        [training.model]
        kind = "gradient_boosting"
        learning_rate = 2.0
    "#;
    assert!(matches!(
        PipelineConfig::from_toml_str(toml),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn test_malformed_toml_is_a_config_error() {
    assert!(matches!(
        PipelineConfig::from_toml_str("[training\ncutoff = "),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn test_toml_round_trip_and_file_loading() {
    let config = PipelineConfig::default();
    let text = config.to_toml_string().unwrap();

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", text).unwrap();
    let loaded = PipelineConfig::from_file(file.path()).unwrap();
    assert_eq!(loaded, config);

    assert!(matches!(
        PipelineConfig::from_file("does/not/exist.toml"),
        Err(ForecastError::IoError(_))
    ));
}
