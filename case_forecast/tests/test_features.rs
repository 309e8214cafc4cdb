use approx::assert_abs_diff_eq;
use case_forecast::data::{WeekAnchor, WeeklyPoint, WeeklySeries};
use case_forecast::error::ForecastError;
use case_forecast::features::{FeatureSchema, FeatureSynthesizer, LagConfig, UnifiedSeries};
use chrono::{Datelike, Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::tempdir;
use weekly_math::seasonality::week_of_year_encoding;

fn first_week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn cases(n: usize) -> WeeklySeries {
    let values: Vec<f64> = (0..n).map(|i| (i * 10) as f64).collect();
    WeeklySeries::from_values("cases", WeekAnchor::Sunday, first_week(), &values).unwrap()
}

fn signal(name: &str, n: usize, offset: f64) -> WeeklySeries {
    let values: Vec<f64> = (0..n).map(|i| offset + i as f64).collect();
    WeeklySeries::from_values(name, WeekAnchor::Sunday, first_week(), &values).unwrap()
}

fn climate(n: usize) -> Vec<WeeklySeries> {
    vec![
        signal("precipitation_mm", n, 100.0),
        signal("temp_mean", n, 200.0),
        signal("humidity", n, 300.0),
    ]
}

#[test]
fn test_schema_column_order() {
    let schema = FeatureSchema::new("cases", &LagConfig::default());
    let names = schema.names();

    assert_eq!(
        names,
        vec![
            "week_sin",
            "week_cos",
            "lag_cases_w1",
            "lag_cases_w2",
            "lag_cases_w4",
            "lag_cases_w8",
            "lag_precipitation_mm_w2",
            "lag_precipitation_mm_w3",
            "lag_precipitation_mm_w4",
            "lag_precipitation_mm_w8",
            "lag_temp_mean_w2",
            "lag_temp_mean_w3",
            "lag_temp_mean_w4",
            "lag_temp_mean_w8",
            "lag_humidity_w2",
            "lag_humidity_w3",
            "lag_humidity_w4",
            "lag_humidity_w8",
        ]
    );
    assert_eq!(schema.width(), names.len());
    assert_eq!(schema.max_target_lag(), 8);
}

#[test]
fn test_autoregressive_schema_has_no_climate() {
    let schema = FeatureSchema::new("cases", &LagConfig::default().autoregressive_only());
    assert_eq!(schema.width(), 6);
    assert!(schema.exogenous_lags.is_empty());
    assert!(!schema.names().iter().any(|n| n.contains("humidity")));
}

#[test]
fn test_warm_up_rows_are_dropped() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(20), &climate(20)).unwrap();
    let table = synthesizer.synthesize(&unified).unwrap();

    // Weeks 0..7 cannot see eight weeks back
    assert_eq!(table.len(), 12);
    assert_eq!(table.rows()[0].week_ending, first_week() + Duration::weeks(8));
}

#[test]
fn test_every_lag_points_to_an_earlier_observed_week() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(30), &climate(30)).unwrap();
    let table = synthesizer.synthesize(&unified).unwrap();
    let schema = table.schema();

    for row in table.rows() {
        let index = (row.week_ending - first_week()).num_weeks();
        assert_eq!(row.target, Some((index * 10) as f64));

        for (value, &k) in row.target_lags.iter().zip(&schema.target_lags) {
            let lagged = index - k as i64;
            assert!(lagged >= 0);
            assert_eq!(*value, (lagged * 10) as f64);
        }

        let mut values = row.exogenous_lags.iter();
        for offset in [100.0, 200.0, 300.0] {
            for &k in &schema.exogenous_lags {
                let lagged = index - k as i64;
                assert!(lagged >= 0);
                assert_eq!(*values.next().unwrap(), offset + lagged as f64);
            }
        }
        assert!(values.next().is_none());
    }
}

#[test]
fn test_calendar_encoding_uses_iso_week() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default().autoregressive_only()).unwrap();
    let unified = synthesizer.join(&cases(60), &[]).unwrap();
    let table = synthesizer.synthesize(&unified).unwrap();

    for row in table.rows() {
        assert_eq!(row.week_of_year, row.week_ending.iso_week().week());
        let (sin, cos) = week_of_year_encoding(row.week_of_year);
        assert_abs_diff_eq!(row.calendar[0], sin, epsilon = 1e-12);
        assert_abs_diff_eq!(row.calendar[1], cos, epsilon = 1e-12);
    }
}

#[test]
fn test_climate_gap_drops_only_affected_rows() {
    let mut points: Vec<WeeklyPoint> = signal("humidity", 30, 300.0).points().to_vec();
    // Remove the humidity reading of week 15
    points.remove(15);
    let humidity = WeeklySeries::new("humidity", WeekAnchor::Sunday, points).unwrap();
    let exogenous = vec![
        signal("precipitation_mm", 30, 100.0),
        signal("temp_mean", 30, 200.0),
        humidity,
    ];

    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(30), &exogenous).unwrap();
    assert_eq!(unified.len(), 30);
    let table = synthesizer.synthesize(&unified).unwrap();

    // Rows at weeks 15 + {2, 3, 4, 8} need the missing value
    let dropped: Vec<NaiveDate> = [17, 18, 19, 23]
        .iter()
        .map(|&i| first_week() + Duration::weeks(i))
        .collect();
    assert_eq!(table.len(), 22 - dropped.len());
    assert!(table.rows().iter().all(|r| !dropped.contains(&r.week_ending)));
}

#[test]
fn test_join_fills_missing_target_weeks_with_zero() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(10), &climate(14)).unwrap();

    assert_eq!(unified.len(), 14);
    assert_eq!(unified.last_week(), Some(first_week() + Duration::weeks(13)));
    for week in &unified.weeks()[10..] {
        assert_eq!(week.target, 0.0);
        assert!(week.exogenous.iter().all(|v| v.is_some()));
    }
}

#[test]
fn test_join_exposes_missing_exogenous_weeks() {
    let unified = UnifiedSeries::join(&cases(14), &climate(10)).unwrap();

    assert_eq!(unified.exogenous_index("temp_mean"), Some(1));
    for week in &unified.weeks()[10..] {
        assert!(week.exogenous.iter().all(|v| v.is_none()));
    }
}

#[test]
fn test_join_rejects_a_hole_in_the_union() {
    let late = WeeklySeries::from_values(
        "temp_mean",
        WeekAnchor::Sunday,
        first_week() + Duration::weeks(12),
        &[1.0, 2.0],
    )
    .unwrap();

    let result = UnifiedSeries::join(&cases(10), &[late]);
    assert!(matches!(result, Err(ForecastError::DataGap { .. })));
}

#[test]
fn test_join_rejects_mixed_anchors() {
    let monday = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let other = WeeklySeries::from_values("temp_mean", WeekAnchor::Monday, monday, &[1.0, 2.0]).unwrap();

    let result = UnifiedSeries::join(&cases(10), &[other]);
    match result {
        Err(ForecastError::DataGap { signal, .. }) => assert_eq!(signal, "temp_mean"),
        other => panic!("Expected DataGap, got {:?}", other),
    }
}

#[test]
fn test_unknown_signal_is_a_feature_mismatch() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer
        .join(&cases(20), &[signal("precipitation_mm", 20, 0.0)])
        .unwrap();

    match synthesizer.synthesize(&unified) {
        Err(ForecastError::FeatureMismatch { missing, .. }) => {
            assert_eq!(missing, vec!["temp_mean".to_string(), "humidity".to_string()]);
        }
        other => panic!("Expected FeatureMismatch, got {:?}", other),
    }
}

#[rstest]
#[case(vec![], vec![2], vec!["temp_mean"])]
#[case(vec![0, 1], vec![2], vec!["temp_mean"])]
#[case(vec![1, 1], vec![2], vec!["temp_mean"])]
#[case(vec![1], vec![], vec!["temp_mean"])]
#[case(vec![1], vec![0], vec!["temp_mean"])]
#[case(vec![1], vec![2], vec!["temp_mean", "temp_mean"])]
fn test_invalid_lag_config(
    #[case] target_lags: Vec<usize>,
    #[case] exogenous_lags: Vec<usize>,
    #[case] signals: Vec<&str>,
) {
    let config = LagConfig {
        target_lags,
        exogenous_lags,
        exogenous_signals: signals.into_iter().map(String::from).collect(),
    };
    assert!(matches!(
        FeatureSynthesizer::new(config),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_schema_mismatch_lists_differing_columns() {
    let with_climate = FeatureSchema::new("cases", &LagConfig::default());
    let without = FeatureSchema::new("cases", &LagConfig::default().autoregressive_only());

    assert!(with_climate.ensure_matches(&with_climate.clone()).is_ok());
    match with_climate.ensure_matches(&without) {
        Err(ForecastError::FeatureMismatch { missing, unexpected }) => {
            assert_eq!(missing.len(), 12);
            assert!(missing.contains(&"lag_humidity_w8".to_string()));
            assert!(unexpected.is_empty());
        }
        other => panic!("Expected FeatureMismatch, got {:?}", other),
    }
}

#[test]
fn test_training_rows_and_horizon_split_at_cutoff() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(30), &climate(30)).unwrap();
    let table = synthesizer.synthesize(&unified).unwrap();
    let cutoff = first_week() + Duration::weeks(20);

    let training = table.training_rows(cutoff);
    assert_eq!(training.len(), 12);
    assert!(training.iter().all(|r| r.week_ending < cutoff));

    let horizon = table.horizon(cutoff, Some(cutoff + Duration::weeks(3)));
    assert_eq!(horizon.len(), 4);
    assert_eq!(horizon.rows()[0].week_ending, cutoff);
    assert!(horizon.rows().iter().all(|r| r.target.is_none()));
    assert_eq!(horizon.schema(), table.schema());
}

#[test]
fn test_feature_table_export() {
    let synthesizer = FeatureSynthesizer::new(LagConfig::default()).unwrap();
    let unified = synthesizer.join(&cases(20), &climate(20)).unwrap();
    let table = synthesizer.synthesize(&unified).unwrap();

    let df = table.to_dataframe().unwrap();
    assert_eq!(df.height(), 12);
    assert_eq!(df.width(), table.schema().width() + 3);
    assert!(df.column("lag_cases_w4").is_ok());

    let horizon = table.horizon(first_week(), None);
    let df = horizon.to_dataframe().unwrap();
    assert_eq!(df.column("cases").unwrap().null_count(), 12);

    let dir = tempdir().unwrap();
    let csv = dir.path().join("features.csv");
    let parquet = dir.path().join("features.parquet");
    table.write_csv(&csv).unwrap();
    table.write_parquet(&parquet).unwrap();

    let content = std::fs::read_to_string(&csv).unwrap();
    let header = content.lines().next().unwrap();
    assert!(header.starts_with("week_ending,week_of_year,week_sin,week_cos,lag_cases_w1"));
    assert_eq!(content.lines().count(), 13);
    assert!(std::fs::metadata(&parquet).unwrap().len() > 0);
}
