//! Shared fixtures: a small churn dataset laid out the way a run expects it

#![allow(dead_code)]

use binary_forest::data::write_csv;
use binary_forest::paths::{ConfigPaths, Paths};
use binary_forest::schema::BinaryClassificationSchema;
use polars::prelude::*;
use std::path::Path;

pub const SCHEMA_JSON: &str = r#"{
    "title": "Customer churn",
    "description": "Synthetic churn data",
    "modelCategory": "binary_classification",
    "schemaVersion": 1.0,
    "inputDataFormat": "CSV",
    "encoding": "utf-8",
    "id": {"name": "customer_id", "description": "Unique customer id"},
    "target": {"name": "churn", "description": "Whether the customer left", "classes": ["no", "yes"]},
    "features": [
        {"name": "age", "description": "Age in years", "dataType": "NUMERIC", "example": 31.0, "nullable": true},
        {"name": "spend", "description": "Monthly spend", "dataType": "NUMERIC", "example": 42.5, "nullable": false},
        {"name": "plan", "description": "Plan tier", "dataType": "CATEGORICAL", "categories": ["basic", "pro", "max"], "nullable": false},
        {"name": "region", "description": "Sales region", "dataType": "CATEGORICAL", "categories": ["north", "south", "east", "west"], "nullable": true}
    ]
}"#;

const PLANS: [&str; 3] = ["basic", "pro", "max"];
const REGIONS: [&str; 4] = ["north", "south", "east", "west"];

pub fn schema() -> BinaryClassificationSchema {
    BinaryClassificationSchema::from_json_str(SCHEMA_JSON).unwrap()
}

/// Deterministic rows; customers churn when older than 45 or on the max plan
pub fn dataset(n: usize, first_id: i64, with_target: bool) -> DataFrame {
    let mut ids = Vec::with_capacity(n);
    let mut ages = Vec::with_capacity(n);
    let mut spends = Vec::with_capacity(n);
    let mut plans = Vec::with_capacity(n);
    let mut regions = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);

    for i in 0..n {
        let age = 20.0 + ((i * 7) % 45) as f64;
        let plan = PLANS[(i * 2) % 3];
        ids.push(first_id + i as i64);
        ages.push(if i % 13 == 5 { None } else { Some(age) });
        spends.push(((i * 31) % 97) as f64 * 1.5 + 10.0);
        plans.push(plan);
        regions.push(if i % 17 == 3 { None } else { Some(REGIONS[i % 4]) });
        labels.push(if age >= 45.0 || plan == "max" { "yes" } else { "no" });
    }

    let mut df = df!(
        "customer_id" => &ids,
        "age" => &ages,
        "spend" => &spends,
        "plan" => &plans,
        "region" => &regions
    )
    .unwrap();
    if with_target {
        df.with_column(Series::new("churn".into(), labels)).unwrap();
    }
    df
}

pub fn write_configs(dir: &Path, hpt: Option<&str>) -> ConfigPaths {
    let config_paths = ConfigPaths::new(dir);
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        &config_paths.model_config,
        r#"{"seed_value": 7, "prediction_field_name": "prediction", "validation_split": 0.2}"#,
    )
    .unwrap();
    std::fs::write(
        &config_paths.default_hyperparameters,
        r#"{"n_estimators": 25, "max_depth": 8, "min_samples_leaf": 1, "max_features": "sqrt"}"#,
    )
    .unwrap();
    std::fs::write(&config_paths.preprocessing, "{}").unwrap();
    std::fs::write(
        &config_paths.hpt,
        hpt.unwrap_or(
            r#"{
                "num_trials": 4,
                "cv_folds": 3,
                "metric": "accuracy",
                "n_initial_points": 2,
                "n_candidates": 50,
                "hyperparameters": [
                    {"name": "n_estimators", "type": "int", "range_low": 5, "range_high": 20},
                    {"name": "min_samples_leaf", "type": "int", "search_type": "log-uniform", "range_low": 1, "range_high": 5},
                    {"name": "criterion", "type": "categorical", "categories": ["gini", "entropy"]}
                ]
            }"#,
        ),
    )
    .unwrap();
    config_paths
}

/// Lay out schema, training and test data under `root`
pub fn write_inputs(root: &Path, n_train: usize, n_test: usize) -> Paths {
    let paths = Paths::new(root);
    std::fs::create_dir_all(&paths.schema_dir).unwrap();
    std::fs::write(paths.schema_dir.join("schema.json"), SCHEMA_JSON).unwrap();

    let mut train = dataset(n_train, 1, true);
    write_csv(&mut train, paths.train_dir.join("train.csv")).unwrap();

    let mut test = dataset(n_test, 10_000, false);
    write_csv(&mut test, paths.test_dir.join("test.csv")).unwrap();
    paths
}
