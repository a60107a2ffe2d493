//! Integration test: schema-driven preprocessing pipeline

mod common;

use binary_forest::data::{cast_key_columns, column_f64, validate_data};
use binary_forest::preprocessing::{PreprocessingConfig, PreprocessingPipeline, TargetEncoder};
use polars::prelude::*;

fn fitted_pipeline(df: &DataFrame) -> PreprocessingPipeline {
    let mut pipeline = PreprocessingPipeline::from_schema(&common::schema(), &PreprocessingConfig::default());
    pipeline.fit(df).unwrap();
    pipeline
}

#[test]
fn test_fit_transform_is_deterministic() {
    let df = common::dataset(90, 1, true);
    let a = fitted_pipeline(&df).to_matrix(&df).unwrap();
    let b = fitted_pipeline(&df).to_matrix(&df).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_output_is_numeric_and_complete() {
    let df = common::dataset(90, 1, true);
    let pipeline = fitted_pipeline(&df);
    let matrix = pipeline.to_matrix(&df).unwrap();

    assert_eq!(matrix.nrows(), 90);
    assert_eq!(matrix.ncols(), pipeline.feature_names().len());
    assert!(matrix.iter().all(|v| v.is_finite()));
    // scaled numeric values are clipped to the configured range
    for name in ["age", "spend"] {
        let idx = pipeline.feature_names().iter().position(|f| f == name).unwrap();
        assert!(matrix.column(idx).iter().all(|v| (-4.0..=4.0).contains(v)));
    }
    assert!(pipeline.feature_names().iter().any(|f| f == "age_is_missing"));
    assert!(pipeline.feature_names().iter().any(|f| f == "plan_max"));
    assert!(!pipeline.feature_names().iter().any(|f| f == "churn" || f == "customer_id"));
}

#[test]
fn test_test_data_uses_training_statistics() {
    let train = common::dataset(90, 1, true);
    let pipeline = fitted_pipeline(&train);

    // a single test row cannot be standardized on its own statistics
    let single = common::dataset(1, 500, false);
    let transformed = pipeline.transform(&single).unwrap();
    let age = column_f64(&transformed, "age").unwrap()[0].unwrap();
    assert!(age.abs() > 0.0);
    assert_eq!(transformed.get_column_names().len(), pipeline.feature_names().len());
}

#[test]
fn test_unseen_category_encodes_without_error() {
    let train = common::dataset(90, 1, true);
    let pipeline = fitted_pipeline(&train);

    let mut test = common::dataset(3, 500, false);
    test.with_column(Series::new("plan".into(), ["platinum", "basic", "pro"]))
        .unwrap();
    let transformed = pipeline.transform(&test).unwrap();

    let basic = column_f64(&transformed, "plan_basic").unwrap();
    let pro = column_f64(&transformed, "plan_pro").unwrap();
    let max = column_f64(&transformed, "plan_max").unwrap();
    assert_eq!((basic[0], pro[0], max[0]), (Some(0.0), Some(0.0), Some(0.0)));
    assert_eq!(basic[1], Some(1.0));
}

#[test]
fn test_saved_pipeline_reproduces_transform() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preprocessing_pipeline.bin");

    let train = common::dataset(90, 1, true);
    let test = common::dataset(20, 500, false);
    let pipeline = fitted_pipeline(&train);
    pipeline.save(&path).unwrap();

    let loaded = PreprocessingPipeline::load(&path).unwrap();
    assert_eq!(loaded.feature_names(), pipeline.feature_names());
    assert_eq!(loaded.to_matrix(&test).unwrap(), pipeline.to_matrix(&test).unwrap());
}

#[test]
fn test_validation_and_target_encoding() {
    let schema = common::schema();
    let train = common::dataset(40, 1, true);
    validate_data(&train, &schema, true).unwrap();

    let test = common::dataset(10, 1, false);
    assert!(validate_data(&test, &schema, true).is_err());
    validate_data(&test, &schema, false).unwrap();

    let no_age = train.drop("age").unwrap();
    let err = validate_data(&no_age, &schema, true).unwrap_err();
    assert!(err.to_string().contains("age"));

    let keyed = cast_key_columns(&train, &schema).unwrap();
    let encoder = TargetEncoder::from_schema(&schema).unwrap();
    let labels = encoder.transform(&keyed).unwrap().unwrap();
    assert_eq!(labels.len(), 40);
    assert!(labels.contains(&0) && labels.contains(&1));
    assert_eq!(encoder.inverse_transform(&[1, 0]).unwrap(), vec!["yes", "no"]);
}
