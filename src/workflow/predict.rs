//! Batch prediction workflow

use crate::artifacts::load_artifact;
use crate::data::{cast_key_columns, read_csv_in_directory, validate_data, write_csv};
use crate::error::{ForestError, Result};
use crate::paths::{ConfigPaths, Paths};
use crate::preprocessing::{PreprocessingPipeline, TargetEncoder};
use crate::schema::BinaryClassificationSchema;
use crate::training::metrics::threshold;
use crate::training::{Classifier, ModelConfig};
use ndarray::Array2;
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Predict the test set with the saved artifacts and write `predictions.csv`.
///
/// The output holds the id column, one probability column per class (named by
/// the class label) and the predicted label under `prediction_field_name`.
pub fn run_batch_predictions(paths: &Paths, config_paths: &ConfigPaths) -> Result<DataFrame> {
    let start = Instant::now();
    info!(root = %paths.root.display(), "Starting batch prediction");

    let model_config = ModelConfig::from_file(&config_paths.model_config)?;
    let schema = BinaryClassificationSchema::load_saved(&paths.saved_schema_path)?;
    let pipeline = PreprocessingPipeline::load(&paths.pipeline_path)?;
    let target_encoder: TargetEncoder = load_artifact(&paths.target_encoder_path)?;
    let classifier = Classifier::load(&paths.predictor_path)?;

    let raw = read_csv_in_directory(&paths.test_dir)?;
    validate_data(&raw, &schema, false)?;
    let data = cast_key_columns(&raw, &schema)?;
    info!(rows = data.height(), "Loaded test data");

    let matrix = pipeline.to_matrix(&data)?;
    let predictions = get_model_predictions(
        &matrix,
        &classifier,
        target_encoder.classes(),
        &model_config.prediction_field_name,
        true,
    )?;
    let mut output = add_ids_to_predictions(&data, &predictions, schema.id())?;

    write_csv(&mut output, &paths.predictions_path)?;
    info!(
        rows = output.height(),
        path = %paths.predictions_path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Predictions saved"
    );
    Ok(output)
}

/// Model output as a frame.
///
/// With `return_probs` the frame carries one probability column per class in
/// `classes` order before the label column `prediction_field_name`; otherwise
/// only the label column.
pub fn get_model_predictions(
    matrix: &Array2<f64>,
    classifier: &Classifier,
    classes: &[String],
    prediction_field_name: &str,
    return_probs: bool,
) -> Result<DataFrame> {
    if classes.len() != 2 {
        return Err(ForestError::ValidationError(format!(
            "expected two class labels, got {:?}",
            classes
        )));
    }
    if classes.iter().any(|c| c == prediction_field_name) {
        return Err(ForestError::ValidationError(format!(
            "prediction field name '{}' collides with a class label",
            prediction_field_name
        )));
    }

    let proba = classifier.predict_proba(matrix)?;
    let positive = proba.column(1).to_vec();
    let labels: Vec<&str> = threshold(&positive)
        .into_iter()
        .map(|c| classes[c].as_str())
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(3);
    if return_probs {
        for (idx, class) in classes.iter().enumerate() {
            columns.push(Column::new(class.as_str().into(), proba.column(idx).to_vec()));
        }
    }
    columns.push(Column::new(prediction_field_name.into(), labels));

    Ok(DataFrame::new(columns)?)
}

/// Prepend the id column of `df` to `predictions`
pub fn add_ids_to_predictions(
    df: &DataFrame,
    predictions: &DataFrame,
    id_field: &str,
) -> Result<DataFrame> {
    if df.height() != predictions.height() {
        return Err(ForestError::ShapeError {
            expected: format!("{} prediction rows", df.height()),
            actual: format!("{} prediction rows", predictions.height()),
        });
    }
    if predictions.get_column_names().iter().any(|c| c.as_str() == id_field) {
        return Err(ForestError::ValidationError(format!(
            "id field '{}' collides with a prediction column",
            id_field
        )));
    }

    let ids = df
        .column(id_field)
        .map_err(|_| ForestError::FeatureNotFound(id_field.to_string()))?
        .cast(&DataType::String)?;

    let mut columns = Vec::with_capacity(predictions.width() + 1);
    columns.push(ids);
    columns.extend(predictions.get_columns().iter().cloned());
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{HyperparameterValue, Hyperparameters};
    use ndarray::array;

    fn classifier() -> (Classifier, Array2<f64>) {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let hp = Hyperparameters::new().with("n_estimators", HyperparameterValue::Int(10));
        let mut clf = Classifier::new(&hp, 0).unwrap();
        clf.fit(&x, &[0, 0, 0, 1, 1, 1]).unwrap();
        (clf, x)
    }

    fn classes() -> Vec<String> {
        vec!["no".to_string(), "yes".to_string()]
    }

    #[test]
    fn test_prediction_columns() {
        let (clf, x) = classifier();
        let preds = get_model_predictions(&x, &clf, &classes(), "prediction", true).unwrap();

        let names: Vec<String> = preds.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["no", "yes", "prediction"]);

        let labels = crate::data::column_str(&preds, "prediction").unwrap();
        assert_eq!(labels[0].as_deref(), Some("no"));
        assert_eq!(labels[5].as_deref(), Some("yes"));

        let no = crate::data::column_f64(&preds, "no").unwrap();
        let yes = crate::data::column_f64(&preds, "yes").unwrap();
        for (a, b) in no.iter().zip(&yes) {
            assert!((a.unwrap() + b.unwrap() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_labels_only() {
        let (clf, x) = classifier();
        let preds = get_model_predictions(&x, &clf, &classes(), "label", false).unwrap();
        assert_eq!(preds.width(), 1);
    }

    #[test]
    fn test_field_name_collision() {
        let (clf, x) = classifier();
        assert!(get_model_predictions(&x, &clf, &classes(), "yes", true).is_err());
    }

    #[test]
    fn test_add_ids() {
        let df = df! { "id" => [10i64, 11], "x" => [0.0, 1.0] }.unwrap();
        let preds = df! { "prediction" => ["a", "b"] }.unwrap();
        let out = add_ids_to_predictions(&df, &preds, "id").unwrap();

        assert_eq!(out.get_column_names()[0].as_str(), "id");
        let ids = crate::data::column_str(&out, "id").unwrap();
        assert_eq!(ids, vec![Some("10".to_string()), Some("11".to_string())]);

        let short = df! { "prediction" => ["a"] }.unwrap();
        assert!(add_ids_to_predictions(&df, &short, "id").is_err());
    }
}
