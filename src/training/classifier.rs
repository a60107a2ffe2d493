//! Random Forest classifier wrapper used by the workflows

use super::hyperparameters::{ForestSettings, Hyperparameters};
use super::metrics::{ClassificationMetrics, Metric};
use super::random_forest::RandomForest;
use crate::artifacts::{load_artifact, save_artifact};
use crate::error::{ForestError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// A Random Forest together with the hyperparameters it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    hyperparameters: Hyperparameters,
    settings: ForestSettings,
    seed: u64,
    forest: RandomForest,
    is_fitted: bool,
}

impl Classifier {
    /// Validate `hyperparameters` and prepare an unfitted forest
    pub fn new(hyperparameters: &Hyperparameters, seed: u64) -> Result<Self> {
        let settings = hyperparameters.to_settings()?;
        let forest = settings.build(seed);
        Ok(Self {
            hyperparameters: hyperparameters.clone(),
            settings,
            seed,
            forest,
            is_fitted: false,
        })
    }

    /// Fit on 0/1 labels; both classes must be present
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ForestError::TrainingError(
                "training labels must contain both classes".to_string(),
            ));
        }

        let start = Instant::now();
        self.forest.fit(x, y)?;
        self.is_fitted = true;

        debug!(
            rows = x.nrows(),
            features = x.ncols(),
            trees = self.forest.n_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted random forest"
        );
        Ok(())
    }

    /// Class probabilities, shape `(n, 2)`, columns in encoded class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }
        self.forest.predict_proba(x)
    }

    /// Encoded 0/1 predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }
        self.forest.predict(x)
    }

    pub fn evaluate(&self, x: &Array2<f64>, y: &[usize]) -> Result<ClassificationMetrics> {
        let proba = self.predict_proba(x)?;
        let positive = proba.column(1).to_vec();
        Ok(ClassificationMetrics::compute(y, &positive))
    }

    pub fn score(&self, x: &Array2<f64>, y: &[usize], metric: Metric) -> Result<f64> {
        let proba = self.predict_proba(x)?;
        let positive = proba.column(1).to_vec();
        Ok(metric.score(y, &positive))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.forest.feature_importances()
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn settings(&self) -> &ForestSettings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }
        save_artifact(self, path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_artifact(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::hyperparameters::HyperparameterValue;
    use ndarray::array;

    fn data() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 1.0],
            [0.2, 0.8],
            [0.1, 0.9],
            [0.3, 1.1],
            [1.0, 0.0],
            [0.9, 0.2],
            [1.1, 0.1],
            [0.8, 0.3],
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters::new().with("n_estimators", HyperparameterValue::Int(15))
    }

    #[test]
    fn test_fit_predict_evaluate() {
        let (x, y) = data();
        let mut clf = Classifier::new(&hyperparameters(), 42).unwrap();
        clf.fit(&x, &y).unwrap();

        assert_eq!(clf.predict(&x).unwrap(), y);
        let metrics = clf.evaluate(&x, &y).unwrap();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(clf.score(&x, &y, Metric::RocAuc).unwrap(), 1.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let (x, _) = data();
        let mut clf = Classifier::new(&hyperparameters(), 42).unwrap();
        assert!(clf.fit(&x, &[1; 8]).is_err());
    }

    #[test]
    fn test_invalid_hyperparameters_rejected() {
        let hp = Hyperparameters::new().with("n_estimators", HyperparameterValue::Int(0));
        assert!(Classifier::new(&hp, 1).is_err());
    }

    #[test]
    fn test_unfitted_errors() {
        let (x, _) = data();
        let clf = Classifier::new(&hyperparameters(), 42).unwrap();
        assert!(matches!(clf.predict_proba(&x), Err(ForestError::ModelNotFitted)));
    }

    #[test]
    fn test_save_load_same_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictor.bin");
        let (x, y) = data();

        let mut clf = Classifier::new(&hyperparameters(), 3).unwrap();
        clf.fit(&x, &y).unwrap();
        clf.save(&path).unwrap();

        let loaded = Classifier::load(&path).unwrap();
        assert_eq!(loaded.predict_proba(&x).unwrap(), clf.predict_proba(&x).unwrap());
        assert_eq!(loaded.hyperparameters(), clf.hyperparameters());
    }
}
