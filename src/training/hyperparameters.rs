//! Model hyperparameters
//!
//! Hyperparameters are a name → value map read from
//! `default_hyperparameters.json`. Tuned values override the defaults, and the
//! merged map is validated into typed [`ForestSettings`] before fitting.

use super::decision_tree::Criterion;
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::{ForestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HyperparameterValue {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl HyperparameterValue {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n.as_f64().map(Self::Real).ok_or_else(|| {
                    ForestError::ConfigError(format!("unsupported number {}", n))
                }),
            },
            other => Err(ForestError::ConfigError(format!(
                "unsupported hyperparameter value {}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(i) => serde_json::json!(i),
            Self::Real(r) => serde_json::json!(r),
            Self::Text(s) => serde_json::json!(s),
            Self::Bool(b) => serde_json::json!(b),
            Self::Null => serde_json::Value::Null,
        }
    }

    /// Numeric view; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Integer view; reals are accepted only when integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Real(r) if r.fract() == 0.0 && r.is_finite() => Some(*r as i64),
            _ => None,
        }
    }
}

impl fmt::Display for HyperparameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Names accepted by [`Hyperparameters::to_settings`]
pub const HYPERPARAMETER_NAMES: [&str; 7] = [
    "n_estimators",
    "max_depth",
    "min_samples_split",
    "min_samples_leaf",
    "max_features",
    "criterion",
    "bootstrap",
];

/// Ordered hyperparameter map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    values: BTreeMap<String, HyperparameterValue>,
}

impl Hyperparameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a flat JSON object
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ForestError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let hyperparameters = Self::from_json_str(&json)?;
        hyperparameters.to_settings()?;
        Ok(hyperparameters)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| ForestError::ConfigError(format!("invalid hyperparameters: {}", e)))?;
        let mut values = BTreeMap::new();
        for (name, value) in &raw {
            values.insert(name.clone(), HyperparameterValue::from_json(value)?);
        }
        Ok(Self { values })
    }

    pub fn is_known(name: &str) -> bool {
        HYPERPARAMETER_NAMES.contains(&name)
    }

    pub fn with(mut self, name: impl Into<String>, value: HyperparameterValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: HyperparameterValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&HyperparameterValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HyperparameterValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of `self` with every value from `overrides` applied
    pub fn merged(&self, overrides: &Hyperparameters) -> Self {
        let mut merged = self.clone();
        for (name, value) in &overrides.values {
            merged.values.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Validate into typed forest settings; unknown names are rejected
    pub fn to_settings(&self) -> Result<ForestSettings> {
        let mut settings = ForestSettings::default();
        for (name, value) in &self.values {
            match name.as_str() {
                "n_estimators" => settings.n_estimators = positive_int(name, value, 1)?,
                "max_depth" => {
                    settings.max_depth = match value {
                        HyperparameterValue::Null => None,
                        v => Some(positive_int(name, v, 1)?),
                    }
                }
                "min_samples_split" => settings.min_samples_split = positive_int(name, value, 2)?,
                "min_samples_leaf" => settings.min_samples_leaf = positive_int(name, value, 1)?,
                "max_features" => settings.max_features = parse_max_features(value)?,
                "criterion" => settings.criterion = parse_criterion(value)?,
                "bootstrap" => {
                    settings.bootstrap = match value {
                        HyperparameterValue::Bool(b) => *b,
                        HyperparameterValue::Text(s) if s == "true" || s == "false" => s == "true",
                        other => return Err(invalid(name, other, "must be a boolean")),
                    }
                }
                _ => return Err(invalid(name, value, "unknown hyperparameter")),
            }
        }
        Ok(settings)
    }
}

fn invalid(name: &str, value: &HyperparameterValue, reason: &str) -> ForestError {
    ForestError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive_int(name: &str, value: &HyperparameterValue, min: i64) -> Result<usize> {
    match value.as_i64() {
        Some(v) if v >= min => Ok(v as usize),
        _ => Err(invalid(name, value, &format!("must be an integer >= {}", min))),
    }
}

fn parse_max_features(value: &HyperparameterValue) -> Result<MaxFeatures> {
    match value {
        HyperparameterValue::Text(s) => match s.to_lowercase().as_str() {
            "sqrt" | "auto" => Ok(MaxFeatures::Sqrt),
            "log2" => Ok(MaxFeatures::Log2),
            "all" | "none" => Ok(MaxFeatures::All),
            _ => Err(invalid("max_features", value, "expected sqrt, log2, all or a fraction")),
        },
        HyperparameterValue::Null => Ok(MaxFeatures::All),
        v => match v.as_f64() {
            Some(f) if f > 0.0 && f <= 1.0 => Ok(MaxFeatures::Fraction(f)),
            _ => Err(invalid("max_features", value, "fraction must be in (0, 1]")),
        },
    }
}

fn parse_criterion(value: &HyperparameterValue) -> Result<Criterion> {
    match value {
        HyperparameterValue::Text(s) if s == "gini" => Ok(Criterion::Gini),
        HyperparameterValue::Text(s) if s == "entropy" || s == "log_loss" => Ok(Criterion::Entropy),
        other => Err(invalid("criterion", other, "expected gini or entropy")),
    }
}

/// Validated Random Forest settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSettings {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub criterion: Criterion,
    pub bootstrap: bool,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            criterion: Criterion::Gini,
            bootstrap: true,
        }
    }
}

impl ForestSettings {
    /// Unfitted forest configured with these settings
    pub fn build(&self, seed: u64) -> RandomForest {
        RandomForest::new(self.n_estimators)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_criterion(self.criterion)
            .with_bootstrap(self.bootstrap)
            .with_random_state(seed)
    }
}
