use approx::assert_abs_diff_eq;
use case_forecast::error::ForecastError;
use case_forecast::features::{FeatureSchema, LagConfig};
use case_forecast::models::{
    BoostingParams, GradientBoosting, LinearParams, LinearRegression, ModelArtifact, ModelKind,
    Regressor, TrainedRegressor,
};
use rstest::rstest;

// y = 3 + 2 * x0 - 0.5 * x1 on a small grid
fn linear_dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for i in 0..10 {
        for j in 0..5 {
            let x0 = i as f64;
            let x1 = (j * j) as f64;
            rows.push(vec![x0, x1]);
            targets.push(3.0 + 2.0 * x0 - 0.5 * x1);
        }
    }
    (rows, targets)
}

// Step in the first column, noise-free
fn step_dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, ((i * 7) % 11) as f64]).collect();
    let targets = rows
        .iter()
        .map(|r| if r[0] < 30.0 { 5.0 } else { 50.0 })
        .collect();
    (rows, targets)
}

fn small_boosting() -> BoostingParams {
    BoostingParams {
        n_estimators: 150,
        learning_rate: 0.1,
        max_depth: 3,
        ..BoostingParams::default()
    }
}

#[test]
fn test_linear_regression_recovers_coefficients() {
    let (rows, targets) = linear_dataset();
    let model = LinearRegression::new(LinearParams::default()).unwrap();
    let trained = model.fit(&rows, &targets).unwrap();

    assert_abs_diff_eq!(trained.intercept(), 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(trained.coefficients()[0], 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(trained.coefficients()[1], -0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(trained.predict(&[4.0, 9.0]), 6.5, epsilon = 1e-9);
    assert_eq!(trained.width(), 2);
}

#[test]
fn test_linear_regression_rejects_collinear_columns() {
    let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
    let targets: Vec<f64> = (0..10).map(|i| i as f64).collect();

    let ols = LinearRegression::new(LinearParams::default()).unwrap();
    assert!(matches!(ols.fit(&rows, &targets), Err(ForecastError::Math(_))));

    let ridge = LinearRegression::new(LinearParams { ridge: 1.0 }).unwrap();
    assert!(ridge.fit(&rows, &targets).is_ok());
}

#[test]
fn test_gradient_boosting_learns_a_step() {
    let (rows, targets) = step_dataset();
    let model = GradientBoosting::new(small_boosting()).unwrap();
    let trained = model.fit(&rows, &targets).unwrap();

    assert_eq!(trained.trees(), 150);
    assert!((trained.predict(&[10.0, 3.0]) - 5.0).abs() < 1.0);
    assert!((trained.predict(&[45.0, 3.0]) - 50.0).abs() < 1.0);

    // Only the first column separates the targets
    let importance = trained.feature_importance();
    assert!(importance[0] > importance[1]);
}

#[test]
fn test_gradient_boosting_is_deterministic_for_a_seed() {
    let (rows, targets) = step_dataset();
    let model = GradientBoosting::new(small_boosting()).unwrap();

    let first = model.fit(&rows, &targets).unwrap();
    let second = model.fit(&rows, &targets).unwrap();
    for row in &rows {
        assert_eq!(first.predict(row).to_bits(), second.predict(row).to_bits());
    }
    assert_eq!(first.feature_importance(), second.feature_importance());
}

#[test]
fn test_gradient_boosting_seed_changes_the_ensemble() {
    let rows: Vec<Vec<f64>> = (0..50)
        .map(|i| vec![i as f64, ((i * 13) % 17) as f64, ((i * 5) % 7) as f64])
        .collect();
    let targets: Vec<f64> = rows.iter().map(|r| r[0] * 0.3 + r[1] - r[2] * 2.0).collect();

    let a = GradientBoosting::new(small_boosting()).unwrap().fit(&rows, &targets).unwrap();
    let b = GradientBoosting::new(BoostingParams {
        seed: 7,
        ..small_boosting()
    })
    .unwrap()
    .fit(&rows, &targets)
    .unwrap();

    assert!(rows.iter().any(|r| a.predict(r) != b.predict(r)));
}

#[rstest]
#[case(BoostingParams { n_estimators: 0, ..BoostingParams::default() })]
#[case(BoostingParams { learning_rate: 0.0, ..BoostingParams::default() })]
#[case(BoostingParams { subsample: 1.5, ..BoostingParams::default() })]
#[case(BoostingParams { colsample: -0.1, ..BoostingParams::default() })]
#[case(BoostingParams { max_depth: 0, ..BoostingParams::default() })]
#[case(BoostingParams { min_samples_leaf: 0, ..BoostingParams::default() })]
fn test_invalid_boosting_params(#[case] params: BoostingParams) {
    assert!(matches!(
        GradientBoosting::new(params),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_default_boosting_params() {
    let params = BoostingParams::default();
    assert_eq!(params.n_estimators, 1000);
    assert_eq!(params.learning_rate, 0.01);
    assert_eq!(params.max_depth, 6);
    assert_eq!(params.subsample, 0.8);
    assert_eq!(params.colsample, 0.8);
    assert_eq!(params.seed, 42);
}

#[test]
fn test_model_kind_is_tagged() {
    let kind: ModelKind = serde_json::from_str(r#"{"kind": "linear", "ridge": 0.5}"#).unwrap();
    assert_eq!(kind, ModelKind::Linear(LinearParams { ridge: 0.5 }));

    let kind: ModelKind = serde_json::from_str(r#"{"kind": "gradient_boosting", "max_depth": 4}"#).unwrap();
    match kind {
        ModelKind::GradientBoosting(params) => {
            assert_eq!(params.max_depth, 4);
            assert_eq!(params.n_estimators, 1000);
        }
        other => panic!("Expected gradient boosting, got {:?}", other),
    }
}

#[test]
fn test_artifact_checks_width_and_schema() {
    let schema = FeatureSchema::new("cases", &LagConfig::default().autoregressive_only());
    let rows: Vec<Vec<f64>> = (0..20)
        .map(|i| vec![0.0, 1.0, i as f64, (i + 1) as f64, (i * 2) as f64, 1.0 + (i * i) as f64])
        .collect();
    let targets: Vec<f64> = rows.iter().map(|r| 1.0 + r[2] + 0.5 * r[4]).collect();

    let trained = ModelKind::Linear(LinearParams { ridge: 0.1 }).fit(&rows, &targets).unwrap();
    let artifact = ModelArtifact::new(schema.clone(), trained).unwrap();
    assert!(artifact.predict(&schema, &rows[0]).is_ok());
    assert!(matches!(
        artifact.predict(&schema, &rows[0][..5]),
        Err(ForecastError::DataError(_))
    ));

    let other = FeatureSchema::new("cases", &LagConfig::default());
    assert!(matches!(
        artifact.predict(&other, &rows[0]),
        Err(ForecastError::FeatureMismatch { .. })
    ));

    let narrow = ModelKind::Linear(LinearParams { ridge: 0.1 })
        .fit(&[vec![1.0], vec![2.0], vec![3.0]], &[1.0, 2.0, 3.0])
        .unwrap();
    assert!(ModelArtifact::new(schema, narrow).is_err());
}

#[test]
fn test_importance_is_normalised_and_ranked() {
    let schema = FeatureSchema::new("cases", &LagConfig::default().autoregressive_only());
    let rows: Vec<Vec<f64>> = (0..80)
        .map(|i| {
            let t = i as f64;
            vec![(t / 8.0).sin(), (t / 8.0).cos(), t, (t * 3.0) % 7.0, (t * 5.0) % 11.0, (t * 7.0) % 13.0]
        })
        .collect();
    let targets: Vec<f64> = rows.iter().map(|r| 2.0 * r[2] + 1.0).collect();

    let trained = ModelKind::GradientBoosting(small_boosting()).fit(&rows, &targets).unwrap();
    let artifact = ModelArtifact::new(schema, trained).unwrap();
    let ranked = artifact.importance();

    assert_eq!(ranked.len(), 6);
    assert_abs_diff_eq!(ranked.iter().map(|f| f.score).sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(ranked[0].feature, "lag_cases_w1");
}
