//! Preprocessing configuration

use crate::error::{ForestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How missing numeric values are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputationMethod {
    Mean,
    Median,
}

/// SMOTE settings for the training data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalancingConfig {
    pub enabled: bool,
    pub k_neighbors: usize,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            k_neighbors: 5,
        }
    }
}

/// Configuration for the preprocessing pipeline, loaded from `preprocessing.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreprocessingConfig {
    /// Fill strategy for numeric features
    pub imputation_method: ImputationMethod,

    /// Add a `<col>_is_missing` flag for numeric features with nulls
    pub add_missing_indicator: bool,

    /// Lower bound applied after standard scaling
    pub clip_min: f64,

    /// Upper bound applied after standard scaling
    pub clip_max: f64,

    /// Categorical features with a smaller missing fraction are filled with
    /// their most frequent value, the rest with `missing_tag`
    pub most_frequent_threshold: f64,

    pub missing_tag: String,

    /// Minimum category frequency to avoid being grouped as rare
    pub rare_label_tol: f64,

    /// Minimum distinct categories before rare grouping applies
    pub rare_label_n_categories: usize,

    pub rare_label: String,

    pub drop_constant_features: bool,

    pub drop_correlated_features: bool,

    /// Absolute Pearson correlation above which the later feature is dropped
    pub correlation_threshold: f64,

    pub balancing: BalancingConfig,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            imputation_method: ImputationMethod::Mean,
            add_missing_indicator: true,
            clip_min: -4.0,
            clip_max: 4.0,
            most_frequent_threshold: 0.1,
            missing_tag: "missing".to_string(),
            rare_label_tol: 0.03,
            rare_label_n_categories: 1,
            rare_label: "Rare".to_string(),
            drop_constant_features: true,
            drop_correlated_features: true,
            correlation_threshold: 0.95,
            balancing: BalancingConfig::default(),
        }
    }
}

impl PreprocessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate from a JSON file
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
        if !(self.clip_min < self.clip_max) {
            return Err(ForestError::ConfigError(format!(
                "clip_min ({}) must be below clip_max ({})",
                self.clip_min, self.clip_max
            )));
        }
        if !(0.0..=1.0).contains(&self.most_frequent_threshold) {
            return Err(ForestError::ConfigError(format!(
                "most_frequent_threshold must be in [0, 1], got {}",
                self.most_frequent_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.rare_label_tol) {
            return Err(ForestError::ConfigError(format!(
                "rare_label_tol must be in [0, 1), got {}",
                self.rare_label_tol
            )));
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(ForestError::ConfigError(format!(
                "correlation_threshold must be in [0, 1], got {}",
                self.correlation_threshold
            )));
        }
        if self.missing_tag.is_empty() || self.rare_label.is_empty() {
            return Err(ForestError::ConfigError(
                "missing_tag and rare_label must not be empty".to_string(),
            ));
        }
        if self.balancing.enabled && self.balancing.k_neighbors == 0 {
            return Err(ForestError::ConfigError(
                "balancing.k_neighbors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_imputation(mut self, method: ImputationMethod) -> Self {
        self.imputation_method = method;
        self
    }

    pub fn with_missing_indicator(mut self, enabled: bool) -> Self {
        self.add_missing_indicator = enabled;
        self
    }

    pub fn with_clip_range(mut self, min: f64, max: f64) -> Self {
        self.clip_min = min;
        self.clip_max = max;
        self
    }

    pub fn with_correlation_threshold(mut self, threshold: f64) -> Self {
        self.correlation_threshold = threshold;
        self
    }

    pub fn with_balancing(mut self, enabled: bool) -> Self {
        self.balancing.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.imputation_method, ImputationMethod::Mean);
        assert_eq!(config.clip_min, -4.0);
        assert_eq!(config.rare_label, "Rare");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PreprocessingConfig =
            serde_json::from_str(r#"{"imputation_method": "median", "balancing": {"enabled": false}}"#)
                .unwrap();
        assert_eq!(config.imputation_method, ImputationMethod::Median);
        assert!(!config.balancing.enabled);
        assert_eq!(config.balancing.k_neighbors, 5);
        assert_eq!(config.correlation_threshold, 0.95);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: std::result::Result<PreprocessingConfig, _> =
            serde_json::from_str(r#"{"imputation": "mean"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = PreprocessingConfig::new().with_clip_range(3.0, -3.0);
        assert!(config.validate().is_err());

        let config = PreprocessingConfig::new()
            .with_imputation(ImputationMethod::Median)
            .with_balancing(false);
        assert!(config.validate().is_ok());
    }
}
