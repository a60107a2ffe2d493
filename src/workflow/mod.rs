//! End-to-end training and batch prediction workflows

pub mod predict;
pub mod train;

pub use predict::{add_ids_to_predictions, get_model_predictions, run_batch_predictions};
pub use train::{run_training, FeatureImportance, TrainingSummary};

use crate::error::{ForestError, Result};
use crate::optimizer::TuningConfig;
use crate::paths::ConfigPaths;
use crate::preprocessing::{BalancingConfig, PreprocessingConfig, Smote};
use crate::training::{Hyperparameters, ModelConfig};
use ndarray::Array2;
use tracing::debug;

/// Every configuration file a training run reads, loaded and validated
#[derive(Debug, Clone)]
pub struct RunConfigs {
    pub model: ModelConfig,
    pub hyperparameters: Hyperparameters,
    pub preprocessing: PreprocessingConfig,
    /// Present only when tuning was requested
    pub tuning: Option<TuningConfig>,
}

impl RunConfigs {
    pub fn load(paths: &ConfigPaths, with_tuning: bool) -> Result<Self> {
        let model = ModelConfig::from_file(&paths.model_config)?;
        let hyperparameters = Hyperparameters::from_file(&paths.default_hyperparameters)?;
        let preprocessing = PreprocessingConfig::from_file(&paths.preprocessing)?;

        let tuning = if with_tuning {
            let tuning = TuningConfig::from_file(&paths.hpt)?;
            for spec in &tuning.hyperparameters {
                if !Hyperparameters::is_known(&spec.name) {
                    return Err(ForestError::ConfigError(format!(
                        "hpt.json declares unknown hyperparameter '{}'",
                        spec.name
                    )));
                }
            }
            Some(tuning)
        } else {
            None
        };

        debug!(
            seed = model.seed_value,
            validation_split = model.validation_split,
            tuning = with_tuning,
            "Loaded configuration"
        );
        Ok(Self {
            model,
            hyperparameters,
            preprocessing,
            tuning,
        })
    }
}

/// Oversample the minority class when balancing is enabled
pub(crate) fn balance(
    x: &Array2<f64>,
    y: &[usize],
    config: &BalancingConfig,
    seed: u64,
) -> Result<(Array2<f64>, Vec<usize>)> {
    if !config.enabled {
        return Ok((x.clone(), y.to_vec()));
    }
    Smote::new(config.k_neighbors, seed).fit_resample(x, y)
}
