//! Integration test: training run followed by batch prediction

mod common;

use binary_forest::data::{column_f64, column_names, column_str, read_csv, write_csv};
use binary_forest::paths::Paths;
use binary_forest::preprocessing::PreprocessingPipeline;
use binary_forest::training::Classifier;
use binary_forest::workflow::{get_model_predictions, run_batch_predictions, run_training, TrainingSummary};

#[test]
fn test_train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 120, 30);
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    let summary = run_training(&paths, &config_paths, false).unwrap();
    assert!(!summary.tuned);
    assert_eq!(summary.classes, vec!["no", "yes"]);
    assert_eq!(summary.n_train_rows + summary.n_validation_rows, 120);
    assert!(summary.validation_metrics.is_some());

    for artifact in [
        &paths.saved_schema_path,
        &paths.pipeline_path,
        &paths.target_encoder_path,
        &paths.predictor_path,
        &paths.training_summary_path,
    ] {
        assert!(artifact.exists(), "missing {}", artifact.display());
    }
    assert!(!paths.hpt_results_path.exists());

    let predictions = run_batch_predictions(&paths, &config_paths).unwrap();
    assert_eq!(predictions.height(), 30);
    assert_eq!(column_names(&predictions), vec!["customer_id", "no", "yes", "prediction"]);

    let no = column_f64(&predictions, "no").unwrap();
    let yes = column_f64(&predictions, "yes").unwrap();
    let labels = column_str(&predictions, "prediction").unwrap();
    for i in 0..predictions.height() {
        let (p_no, p_yes) = (no[i].unwrap(), yes[i].unwrap());
        assert!((p_no + p_yes - 1.0).abs() < 1e-9);
        let expected = if p_yes > 0.5 { "yes" } else { "no" };
        assert_eq!(labels[i].as_deref(), Some(expected));
    }

    let ids = column_str(&predictions, "customer_id").unwrap();
    assert_eq!(ids[0].as_deref(), Some("10000"));

    let written = read_csv(&paths.predictions_path).unwrap();
    assert_eq!(written.height(), 30);

    let saved: TrainingSummary =
        serde_json::from_str(&std::fs::read_to_string(&paths.training_summary_path).unwrap()).unwrap();
    assert_eq!(saved.feature_names, summary.feature_names);
    assert_eq!(saved.feature_importances.len(), summary.feature_names.len());
}

#[test]
fn test_same_seed_gives_same_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 100, 20);
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    run_training(&paths, &config_paths, false).unwrap();
    let first = run_batch_predictions(&paths, &config_paths).unwrap();
    run_training(&paths, &config_paths, false).unwrap();
    let second = run_batch_predictions(&paths, &config_paths).unwrap();

    assert!(first.equals_missing(&second));
}

#[test]
fn test_persisted_artifacts_match_in_memory_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 100, 25);
    let config_paths = common::write_configs(&dir.path().join("config"), None);
    run_training(&paths, &config_paths, false).unwrap();

    let pipeline = PreprocessingPipeline::load(&paths.pipeline_path).unwrap();
    let classifier = Classifier::load(&paths.predictor_path).unwrap();
    let test = common::dataset(25, 10_000, false);
    let matrix = pipeline.to_matrix(&test).unwrap();

    let classes = vec!["no".to_string(), "yes".to_string()];
    let direct = get_model_predictions(&matrix, &classifier, &classes, "prediction", true).unwrap();
    let batch = run_batch_predictions(&paths, &config_paths).unwrap();

    assert_eq!(column_f64(&direct, "yes").unwrap(), column_f64(&batch, "yes").unwrap());
    assert_eq!(
        column_str(&direct, "prediction").unwrap(),
        column_str(&batch, "prediction").unwrap()
    );
}

#[test]
fn test_training_with_tuning() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 90, 10);
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    let summary = run_training(&paths, &config_paths, true).unwrap();
    assert!(summary.tuned);
    assert_eq!(summary.tuning_metric.as_deref(), Some("accuracy"));
    assert!(summary.tuning_best_score.is_some());

    let n_estimators = summary.hyperparameters["n_estimators"].as_i64().unwrap();
    assert!((5..=20).contains(&n_estimators));
    let leaf = summary.hyperparameters["min_samples_leaf"].as_i64().unwrap();
    assert!((1..=5).contains(&leaf));
    let criterion = summary.hyperparameters["criterion"].as_str().unwrap();
    assert!(criterion == "gini" || criterion == "entropy");
    // untuned values come from default_hyperparameters.json
    assert_eq!(summary.hyperparameters["max_depth"].as_i64(), Some(8));

    let results = read_csv(&paths.hpt_results_path).unwrap();
    assert_eq!(results.height(), 4);
    assert_eq!(
        column_names(&results),
        vec![
            "trial",
            "n_estimators",
            "min_samples_leaf",
            "criterion",
            "mean_score",
            "score_std",
            "duration_secs",
            "status"
        ]
    );

    let predictions = run_batch_predictions(&paths, &config_paths).unwrap();
    assert_eq!(predictions.height(), 10);
}

#[test]
fn test_unknown_tuning_parameter_fails_before_fitting() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 60, 5);
    let config_paths = common::write_configs(
        &dir.path().join("config"),
        Some(r#"{"hyperparameters": [{"name": "learning_rate", "type": "real", "range_low": 0.01, "range_high": 0.3}]}"#),
    );

    let err = run_training(&paths, &config_paths, true).unwrap_err();
    assert!(err.to_string().contains("learning_rate"));
    assert!(!paths.predictor_path.exists());
}

#[test]
fn test_missing_schema_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 40, 5);
    std::fs::remove_file(paths.schema_dir.join("schema.json")).unwrap();
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    assert!(run_training(&paths, &config_paths, false).is_err());
    assert!(!paths.pipeline_path.exists());
}

#[test]
fn test_training_data_without_target_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = common::write_inputs(dir.path(), 40, 5);
    let mut unlabeled = common::dataset(40, 1, false);
    write_csv(&mut unlabeled, paths.train_dir.join("train.csv")).unwrap();
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    let err = run_training(&paths, &config_paths, false).unwrap_err();
    assert!(err.to_string().contains("churn"));
}

#[test]
fn test_predict_without_artifacts_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Paths = common::write_inputs(dir.path(), 40, 5);
    let config_paths = common::write_configs(&dir.path().join("config"), None);

    assert!(run_batch_predictions(&paths, &config_paths).is_err());
    assert!(!paths.predictions_path.exists());
}
