//! Training workflow: schema → data → (tuning) → pipeline → model → artifacts

use super::{balance, RunConfigs};
use crate::artifacts::save_artifact;
use crate::data::{cast_key_columns, read_csv_in_directory, stratified_split, take_rows, validate_data};
use crate::error::{ForestError, Result};
use crate::optimizer::{HyperparameterTuner, Study, TuningConfig};
use crate::paths::{ConfigPaths, Paths};
use crate::preprocessing::{PreprocessingConfig, PreprocessingPipeline, TargetEncoder};
use crate::schema::{load_json_schema, BinaryClassificationSchema};
use crate::training::{
    CVResults, CVStrategy, ClassificationMetrics, Classifier, CrossValidator, Hyperparameters,
};
use chrono::Utc;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Record of a training run, written to `training_summary.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// RFC 3339 timestamp of completion
    pub trained_at: String,
    pub seed: u64,
    pub n_train_rows: usize,
    pub n_validation_rows: usize,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub hyperparameters: serde_json::Value,
    pub tuned: bool,
    pub tuning_metric: Option<String>,
    pub tuning_best_score: Option<f64>,
    pub validation_metrics: Option<ClassificationMetrics>,
    /// Sorted by importance, highest first
    pub feature_importances: Vec<FeatureImportance>,
    pub duration_secs: f64,
}

impl TrainingSummary {
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Preprocessed data of one CV fold; the pipeline is fitted on the fold's
/// training rows only
struct FoldData {
    x_train: Array2<f64>,
    y_train: Vec<usize>,
    x_test: Array2<f64>,
    y_test: Vec<usize>,
}

/// Train a model and persist every artifact needed for prediction.
///
/// The schema and all configuration files are loaded and validated before any
/// fitting. With `run_tuning` the hyperparameters from
/// `default_hyperparameters.json` are overridden by the best tuned values.
pub fn run_training(
    paths: &Paths,
    config_paths: &ConfigPaths,
    run_tuning: bool,
) -> Result<TrainingSummary> {
    let start = Instant::now();
    info!(root = %paths.root.display(), tuning = run_tuning, "Starting training");

    let schema = load_json_schema(&paths.schema_dir)?;
    let configs = RunConfigs::load(config_paths, run_tuning)?;
    schema.save(&paths.saved_schema_path)?;
    let seed = configs.model.seed_value;

    let raw = read_csv_in_directory(&paths.train_dir)?;
    validate_data(&raw, &schema, true)?;
    let data = cast_key_columns(&raw, &schema)?;
    info!(rows = data.height(), columns = data.width(), "Loaded training data");

    let target_encoder = TargetEncoder::from_schema(&schema)?;
    let labels = target_encoder.transform(&data)?.ok_or_else(|| {
        ForestError::ValidationError(format!("training data lacks target '{}'", schema.target()))
    })?;

    let (train_idx, val_idx) = stratified_split(&labels, configs.model.validation_split, seed);
    let train_df = take_rows(&data, &train_idx)?;
    let y_train: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();
    debug!(train = train_idx.len(), validation = val_idx.len(), "Split training data");

    let mut hyperparameters = configs.hyperparameters.clone();
    let mut study = None;
    if let Some(tuning) = &configs.tuning {
        let result = tune_hyperparameters(
            &train_df,
            &y_train,
            &schema,
            &configs.preprocessing,
            &configs.hyperparameters,
            tuning,
            seed,
        )?;
        result.save_csv(&paths.hpt_results_path)?;
        if let Some(best) = result.best_params() {
            hyperparameters = hyperparameters.merged(best);
        }
        info!(path = %paths.hpt_results_path.display(), "Saved tuning results");
        study = Some(result);
    }

    let mut pipeline = PreprocessingPipeline::from_schema(&schema, &configs.preprocessing);
    pipeline.fit(&train_df)?;
    let x_train = pipeline.to_matrix(&train_df)?;
    let (x_fit, y_fit) = balance(&x_train, &y_train, &configs.preprocessing.balancing, seed)?;
    info!(
        rows = x_fit.nrows(),
        features = x_fit.ncols(),
        steps = pipeline.steps().len(),
        "Preprocessed training data"
    );

    let mut classifier = Classifier::new(&hyperparameters, seed)?;
    classifier.fit(&x_fit, &y_fit)?;

    let validation_metrics = if val_idx.is_empty() {
        None
    } else {
        let val_df = take_rows(&data, &val_idx)?;
        let y_val: Vec<usize> = val_idx.iter().map(|&i| labels[i]).collect();
        let metrics = classifier.evaluate(&pipeline.to_matrix(&val_df)?, &y_val)?;
        info!(
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            roc_auc = metrics.roc_auc,
            rows = metrics.n_samples,
            "Validation metrics"
        );
        Some(metrics)
    };

    pipeline.save(&paths.pipeline_path)?;
    save_artifact(&target_encoder, &paths.target_encoder_path)?;
    classifier.save(&paths.predictor_path)?;

    let summary = TrainingSummary {
        trained_at: Utc::now().to_rfc3339(),
        seed,
        n_train_rows: train_idx.len(),
        n_validation_rows: val_idx.len(),
        feature_names: pipeline.feature_names().to_vec(),
        classes: target_encoder.classes().to_vec(),
        hyperparameters: hyperparameters.to_json(),
        tuned: study.is_some(),
        tuning_metric: study.as_ref().map(|s| s.metric.to_string()),
        tuning_best_score: study.as_ref().and_then(Study::best_score),
        validation_metrics,
        feature_importances: importances(&classifier, pipeline.feature_names()),
        duration_secs: start.elapsed().as_secs_f64(),
    };
    summary.save(&paths.training_summary_path)?;

    info!(
        artifacts = %paths.artifacts_dir.display(),
        elapsed_s = summary.duration_secs,
        "Training completed"
    );
    Ok(summary)
}

fn importances(classifier: &Classifier, names: &[String]) -> Vec<FeatureImportance> {
    let mut result: Vec<FeatureImportance> = match classifier.feature_importances() {
        Some(values) => names
            .iter()
            .zip(values.iter())
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect(),
        None => Vec::new(),
    };
    result.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    result
}

/// Preprocess every stratified fold once: fit the pipeline on the fold's
/// training rows, transform both sides, balance the training side
fn prepare_folds(
    train_df: &DataFrame,
    y: &[usize],
    schema: &BinaryClassificationSchema,
    preprocessing: &PreprocessingConfig,
    n_folds: usize,
    seed: u64,
) -> Result<Vec<FoldData>> {
    let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
        n_splits: n_folds,
        shuffle: true,
    })
    .with_random_state(seed)
    .split(y.len(), Some(y))?;

    let mut folds = Vec::with_capacity(splits.len());
    for split in splits {
        let fold_train = take_rows(train_df, &split.train_indices)?;
        let fold_test = take_rows(train_df, &split.test_indices)?;
        let y_train: Vec<usize> = split.train_indices.iter().map(|&i| y[i]).collect();
        let y_test: Vec<usize> = split.test_indices.iter().map(|&i| y[i]).collect();

        let mut pipeline = PreprocessingPipeline::from_schema(schema, preprocessing);
        pipeline.fit(&fold_train)?;
        let x_train = pipeline.to_matrix(&fold_train)?;
        let x_test = pipeline.to_matrix(&fold_test)?;
        let (x_train, y_train) = balance(&x_train, &y_train, &preprocessing.balancing, seed)?;

        debug!(
            fold = split.fold_idx,
            train = x_train.nrows(),
            test = x_test.nrows(),
            features = x_train.ncols(),
            "Prepared CV fold"
        );
        folds.push(FoldData {
            x_train,
            y_train,
            x_test,
            y_test,
        });
    }
    Ok(folds)
}

/// Bayesian search over the declared space, scored by stratified k-fold CV on
/// the training split
fn tune_hyperparameters(
    train_df: &DataFrame,
    y: &[usize],
    schema: &BinaryClassificationSchema,
    preprocessing: &PreprocessingConfig,
    defaults: &Hyperparameters,
    tuning: &TuningConfig,
    seed: u64,
) -> Result<Study> {
    let folds = prepare_folds(train_df, y, schema, preprocessing, tuning.cv_folds, seed)?;
    let metric = tuning.metric;
    let mut tuner = HyperparameterTuner::new(tuning.clone(), seed)?;

    tuner.tune(|params| {
        let candidate = defaults.merged(params);
        let mut scores = Vec::with_capacity(folds.len());
        for fold in &folds {
            let mut classifier = Classifier::new(&candidate, seed)?;
            classifier.fit(&fold.x_train, &fold.y_train)?;
            scores.push(classifier.score(&fold.x_test, &fold.y_test, metric)?);
        }
        Ok(CVResults::from_scores(scores))
    })
}
