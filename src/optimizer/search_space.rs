//! Search space definition for hyperparameters

use crate::error::{ForestError, Result};
use crate::training::{HyperparameterValue, Hyperparameters};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous parameter
    Real { low: f64, high: f64, log_scale: bool },
    /// Integer parameter
    Int { low: i64, high: i64, log_scale: bool },
    /// One of a fixed set of values
    Categorical { choices: Vec<HyperparameterValue> },
}

/// A single tunable hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    pub fn real(name: impl Into<String>, low: f64, high: f64, log_scale: bool) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Real { low, high, log_scale },
        }
    }

    pub fn int(name: impl Into<String>, low: i64, high: i64, log_scale: bool) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high, log_scale },
        }
    }

    pub fn categorical(name: impl Into<String>, choices: Vec<HyperparameterValue>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Categorical { choices },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(ForestError::ConfigError(format!(
                "hyperparameter '{}': {}",
                self.name, reason
            )))
        };
        match &self.param_type {
            ParameterType::Real { low, high, log_scale } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return fail("range_low must not exceed range_high");
                }
                if *log_scale && *low <= 0.0 {
                    return fail("log-uniform search needs range_low > 0");
                }
            }
            ParameterType::Int { low, high, log_scale } => {
                if low > high {
                    return fail("range_low must not exceed range_high");
                }
                if *log_scale && *low <= 0 {
                    return fail("log-uniform search needs range_low > 0");
                }
            }
            ParameterType::Categorical { choices } => {
                if choices.is_empty() {
                    return fail("categories must not be empty");
                }
            }
        }
        Ok(())
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> HyperparameterValue {
        match &self.param_type {
            ParameterType::Real { low, high, log_scale } => {
                let val = if *log_scale {
                    let (log_low, log_high) = (low.ln(), high.ln());
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                HyperparameterValue::Real(val.clamp(*low, *high))
            }
            ParameterType::Int { low, high, log_scale } => {
                let val = if *log_scale {
                    // sample in log space over [low, high + 1) then floor
                    let log_low = (*low as f64).ln();
                    let log_high = (*high as f64 + 1.0).ln();
                    let v = (rng.gen::<f64>() * (log_high - log_low) + log_low).exp();
                    (v.floor() as i64).clamp(*low, *high)
                } else {
                    rng.gen_range(*low..=*high)
                };
                HyperparameterValue::Int(val)
            }
            ParameterType::Categorical { choices } => {
                choices[rng.gen_range(0..choices.len())].clone()
            }
        }
    }

    pub fn contains(&self, value: &HyperparameterValue) -> bool {
        match (&self.param_type, value) {
            (ParameterType::Real { low, high, .. }, v) => {
                v.as_f64().is_some_and(|x| x >= *low && x <= *high)
            }
            (ParameterType::Int { low, high, .. }, HyperparameterValue::Int(x)) => {
                x >= low && x <= high
            }
            (ParameterType::Int { .. }, _) => false,
            (ParameterType::Categorical { choices }, v) => choices.contains(v),
        }
    }

    /// Position of `value` in `[0, 1]`; categories map to their evenly spaced index
    pub fn to_unit(&self, value: &HyperparameterValue) -> Option<f64> {
        if !self.contains(value) {
            return None;
        }
        let unit = match &self.param_type {
            ParameterType::Real { low, high, log_scale } => {
                scale(value.as_f64()?, *low, *high, *log_scale)
            }
            ParameterType::Int { low, high, log_scale } => {
                scale(value.as_f64()?, *low as f64, *high as f64, *log_scale)
            }
            ParameterType::Categorical { choices } => {
                let idx = choices.iter().position(|c| c == value)?;
                if choices.len() == 1 {
                    0.5
                } else {
                    idx as f64 / (choices.len() - 1) as f64
                }
            }
        };
        Some(unit)
    }
}

fn scale(x: f64, low: f64, high: f64, log_scale: bool) -> f64 {
    if high <= low {
        return 0.5;
    }
    if log_scale {
        (x.ln() - low.ln()) / (high.ln() - low.ln())
    } else {
        (x - low) / (high - low)
    }
}

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn real(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::real(name, low, high, false))
    }

    pub fn log_real(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::real(name, low, high, true))
    }

    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high, false))
    }

    pub fn categorical(self, name: impl Into<String>, choices: Vec<HyperparameterValue>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    /// Validate every parameter and reject duplicate names
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for param in &self.parameters {
            param.validate()?;
            if !seen.insert(param.name.as_str()) {
                return Err(ForestError::ConfigError(format!(
                    "hyperparameter '{}' is declared more than once",
                    param.name
                )));
            }
        }
        Ok(())
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Sample a random configuration
    pub fn sample(&self, rng: &mut impl Rng) -> Hyperparameters {
        let mut params = Hyperparameters::new();
        for p in &self.parameters {
            params.set(p.name.clone(), p.sample(rng));
        }
        params
    }

    /// Whether every parameter of the space has an in-range value in `params`
    pub fn contains(&self, params: &Hyperparameters) -> bool {
        self.parameters
            .iter()
            .all(|p| params.get(&p.name).is_some_and(|v| p.contains(v)))
    }

    /// Normalized coordinates in declaration order
    pub fn to_unit(&self, params: &Hyperparameters) -> Result<Vec<f64>> {
        self.parameters
            .iter()
            .map(|p| {
                params
                    .get(&p.name)
                    .and_then(|v| p.to_unit(v))
                    .ok_or_else(|| {
                        ForestError::TuningError(format!(
                            "value for '{}' is missing or outside the search space",
                            p.name
                        ))
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Parameter names in declaration order
    pub fn param_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }
}
