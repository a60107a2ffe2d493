//! Integration test: Random Forest training on preprocessed data

mod common;

use binary_forest::preprocessing::{PreprocessingConfig, PreprocessingPipeline, TargetEncoder};
use binary_forest::training::{
    CVResults, CVStrategy, Classifier, CrossValidator, HyperparameterValue, Hyperparameters, Metric,
};
use ndarray::{Array2, Axis};

fn prepared(n: usize) -> (Array2<f64>, Vec<usize>) {
    let schema = common::schema();
    let df = common::dataset(n, 1, true);
    let mut pipeline = PreprocessingPipeline::from_schema(&schema, &PreprocessingConfig::default());
    pipeline.fit(&df).unwrap();
    let labels = TargetEncoder::from_schema(&schema).unwrap().transform(&df).unwrap().unwrap();
    (pipeline.to_matrix(&df).unwrap(), labels)
}

fn hyperparameters(n_estimators: i64) -> Hyperparameters {
    Hyperparameters::new()
        .with("n_estimators", HyperparameterValue::Int(n_estimators))
        .with("max_depth", HyperparameterValue::Int(8))
}

#[test]
fn test_forest_learns_rule() {
    let (x, y) = prepared(150);
    let mut clf = Classifier::new(&hyperparameters(40), 3).unwrap();
    clf.fit(&x, &y).unwrap();

    let metrics = clf.evaluate(&x, &y).unwrap();
    assert!(metrics.accuracy > 0.9, "training accuracy {}", metrics.accuracy);
    assert!(metrics.roc_auc > 0.9);

    let proba = clf.predict_proba(&x).unwrap();
    assert_eq!(proba.ncols(), 2);
    for row in proba.axis_iter(Axis(0)) {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_same_seed_same_model() {
    let (x, y) = prepared(100);
    let mut a = Classifier::new(&hyperparameters(15), 11).unwrap();
    let mut b = Classifier::new(&hyperparameters(15), 11).unwrap();
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
}

#[test]
fn test_feature_importances_normalized() {
    let (x, y) = prepared(100);
    let mut clf = Classifier::new(&hyperparameters(20), 5).unwrap();
    clf.fit(&x, &y).unwrap();

    let importances = clf.feature_importances().unwrap();
    assert_eq!(importances.len(), x.ncols());
    assert!((importances.sum() - 1.0).abs() < 1e-9);
    assert!(importances.iter().all(|&v| v >= 0.0));
}

#[test]
fn test_cross_validated_score() {
    let (x, y) = prepared(120);
    let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
        n_splits: 4,
        shuffle: true,
    })
    .with_random_state(1)
    .split(y.len(), Some(&y))
    .unwrap();

    let mut scores = Vec::new();
    for split in &splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train: Vec<usize> = split.train_indices.iter().map(|&i| y[i]).collect();
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test: Vec<usize> = split.test_indices.iter().map(|&i| y[i]).collect();

        let mut clf = Classifier::new(&hyperparameters(20), 1).unwrap();
        clf.fit(&x_train, &y_train).unwrap();
        scores.push(clf.score(&x_test, &y_test, Metric::F1Score).unwrap());
    }

    let results = CVResults::from_scores(scores);
    assert_eq!(results.n_folds, 4);
    assert!(results.mean_score > 0.7, "mean F1 {}", results.mean_score);
    assert!(results.std_score >= 0.0);
}

#[test]
fn test_default_hyperparameters_file_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default_hyperparameters.json");
    let hp = Hyperparameters::from_file(path).unwrap();
    let settings = hp.to_settings().unwrap();
    assert_eq!(settings.n_estimators, 100);
    assert!(Classifier::new(&hp, 42).is_ok());
}

#[test]
fn test_rejects_mismatched_feature_count() {
    let (x, y) = prepared(60);
    let mut clf = Classifier::new(&hyperparameters(5), 1).unwrap();
    clf.fit(&x, &y).unwrap();
    let narrow = x.select(Axis(1), &[0]);
    assert!(clf.predict(&narrow).is_err());
}
