//! Run configuration for training and prediction

use crate::error::{ForestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings from `model_config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Seed for every random choice in a run
    pub seed_value: u64,

    /// Name of the predicted-label column in the predictions file
    pub prediction_field_name: String,

    /// Fraction of training rows held out for validation metrics
    pub validation_split: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seed_value: 42,
            prediction_field_name: "prediction".to_string(),
            validation_split: 0.1,
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ForestError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            ForestError::ConfigError(format!("invalid {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..0.5).contains(&self.validation_split) {
            return Err(ForestError::ConfigError(format!(
                "validation_split must be in [0, 0.5), got {}",
                self.validation_split
            )));
        }
        if self.prediction_field_name.trim().is_empty() {
            return Err(ForestError::ConfigError(
                "prediction_field_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_value = seed;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    pub fn with_prediction_field_name(mut self, name: impl Into<String>) -> Self {
        self.prediction_field_name = name.into();
        self
    }
}
