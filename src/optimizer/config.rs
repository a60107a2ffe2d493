//! Tuning configuration (`hpt.json`)

use super::search_space::{Parameter, SearchSpace};
use crate::error::{ForestError, Result};
use crate::training::{HyperparameterValue, Metric};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared type of a tunable hyperparameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Int,
    Real,
    Categorical,
}

/// Sampling scale for numeric hyperparameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    #[default]
    #[serde(rename = "uniform")]
    Uniform,
    #[serde(rename = "log-uniform")]
    LogUniform,
}

/// One entry of the `hyperparameters` list in `hpt.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    pub name: String,

    #[serde(default)]
    pub short_desc: String,

    #[serde(rename = "type")]
    pub kind: ParameterKind,

    #[serde(default)]
    pub search_type: SearchType,

    #[serde(default)]
    pub range_low: Option<f64>,

    #[serde(default)]
    pub range_high: Option<f64>,

    #[serde(default)]
    pub categories: Option<Vec<serde_json::Value>>,
}

impl ParameterSpec {
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self::numeric(name, ParameterKind::Int, low as f64, high as f64)
    }

    pub fn real(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::numeric(name, ParameterKind::Real, low, high)
    }

    pub fn categorical(name: impl Into<String>, categories: Vec<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            short_desc: String::new(),
            kind: ParameterKind::Categorical,
            search_type: SearchType::Uniform,
            range_low: None,
            range_high: None,
            categories: Some(categories),
        }
    }

    fn numeric(name: impl Into<String>, kind: ParameterKind, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            short_desc: String::new(),
            kind,
            search_type: SearchType::Uniform,
            range_low: Some(low),
            range_high: Some(high),
            categories: None,
        }
    }

    pub fn log_uniform(mut self) -> Self {
        self.search_type = SearchType::LogUniform;
        self
    }

    fn range(&self) -> Result<(f64, f64)> {
        match (self.range_low, self.range_high) {
            (Some(low), Some(high)) => Ok((low, high)),
            _ => Err(ForestError::ConfigError(format!(
                "hyperparameter '{}' needs range_low and range_high",
                self.name
            ))),
        }
    }

    fn to_int(&self, value: f64) -> Result<i64> {
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Ok(value as i64)
        } else {
            Err(ForestError::ConfigError(format!(
                "integer hyperparameter '{}' bound {} is out of range",
                self.name, value
            )))
        }
    }

    /// Typed search-space parameter for this entry
    pub fn to_parameter(&self) -> Result<Parameter> {
        let log_scale = self.search_type == SearchType::LogUniform;
        let parameter = match self.kind {
            ParameterKind::Real => {
                let (low, high) = self.range()?;
                Parameter::real(&self.name, low, high, log_scale)
            }
            ParameterKind::Int => {
                let (low, high) = self.range()?;
                if low.fract() != 0.0 || high.fract() != 0.0 {
                    return Err(ForestError::ConfigError(format!(
                        "integer hyperparameter '{}' has a non-integral range",
                        self.name
                    )));
                }
                Parameter::int(&self.name, self.to_int(low)?, self.to_int(high)?, log_scale)
            }
            ParameterKind::Categorical => {
                let raw = self.categories.as_ref().ok_or_else(|| {
                    ForestError::ConfigError(format!(
                        "categorical hyperparameter '{}' needs categories",
                        self.name
                    ))
                })?;
                let choices = raw
                    .iter()
                    .map(HyperparameterValue::from_json)
                    .collect::<Result<Vec<_>>>()?;
                Parameter::categorical(&self.name, choices)
            }
        };
        parameter.validate()?;
        Ok(parameter)
    }
}

/// Hyperparameter tuning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Number of trials to run
    pub num_trials: usize,

    /// Cross-validation folds per trial
    pub cv_folds: usize,

    /// Metric to maximize
    pub metric: Metric,

    /// Random trials before the Gaussian process takes over
    pub n_initial_points: Option<usize>,

    /// Random candidates scored by expected improvement per proposal
    pub n_candidates: usize,

    pub hyperparameters: Vec<ParameterSpec>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            num_trials: 20,
            cv_folds: 5,
            metric: Metric::Accuracy,
            n_initial_points: None,
            n_candidates: 500,
            hyperparameters: Vec::new(),
        }
    }
}

impl TuningConfig {
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
        if self.num_trials == 0 {
            return Err(ForestError::ConfigError("num_trials must be at least 1".to_string()));
        }
        if self.cv_folds < 2 {
            return Err(ForestError::ConfigError("cv_folds must be at least 2".to_string()));
        }
        if self.n_candidates == 0 {
            return Err(ForestError::ConfigError("n_candidates must be at least 1".to_string()));
        }
        if self.n_initial_points == Some(0) {
            return Err(ForestError::ConfigError(
                "n_initial_points must be at least 1".to_string(),
            ));
        }
        self.search_space()?;
        Ok(())
    }

    /// Number of random trials before model-based proposals
    pub fn initial_points(&self) -> usize {
        self.n_initial_points
            .unwrap_or_else(|| (self.num_trials / 3).min(5).max(1))
    }

    pub fn search_space(&self) -> Result<SearchSpace> {
        let mut space = SearchSpace::new();
        for spec in &self.hyperparameters {
            space = space.add(spec.to_parameter()?);
        }
        space.validate()?;
        Ok(space)
    }

    pub fn with_num_trials(mut self, n: usize) -> Self {
        self.num_trials = n;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_initial_points(mut self, n: usize) -> Self {
        self.n_initial_points = Some(n);
        self
    }

    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n;
        self
    }

    pub fn with_parameter(mut self, spec: ParameterSpec) -> Self {
        self.hyperparameters.push(spec);
        self
    }
}
