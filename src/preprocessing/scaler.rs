//! Feature scaling

use super::{float_series, present_columns, Transform};
use crate::data::column_f64;
use crate::error::{ForestError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted parameters for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScaleParams {
    column: String,
    mean: f64,
    std: f64,
}

/// Standardizes numeric columns to zero mean and unit population variance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    candidates: Vec<String>,
    params: Vec<ScaleParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fitted `(mean, std)` of a column
    pub fn stats(&self, column: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|p| p.column == column)
            .map(|p| (p.mean, p.std))
    }
}

impl Transform for StandardScaler {
    fn name(&self) -> &'static str {
        "standard_scaler"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.params.clear();
        for column in present_columns(df, &self.candidates) {
            let values: Vec<f64> = column_f64(df, &column)?.into_iter().flatten().collect();
            let n = values.len().max(1) as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            let std = if std > 0.0 && std.is_finite() { std } else { 1.0 };
            self.params.push(ScaleParams { column, mean, std });
        }
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for p in &self.params {
            let scaled = column_f64(df, &p.column)?
                .into_iter()
                .map(|v| v.map(|x| (x - p.mean) / p.std))
                .collect();
            result.with_column(float_series(&p.column, scaled))?;
        }
        Ok(result)
    }
}

/// Clips numeric columns into `[min, max]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueClipper {
    min: f64,
    max: f64,
    candidates: Vec<String>,
    columns: Vec<String>,
    is_fitted: bool,
}

impl ValueClipper {
    pub fn new(min: f64, max: f64, candidates: Vec<String>) -> Self {
        Self {
            min,
            max,
            candidates,
            columns: Vec::new(),
            is_fitted: false,
        }
    }
}

impl Transform for ValueClipper {
    fn name(&self) -> &'static str {
        "value_clipper"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.columns = present_columns(df, &self.candidates);
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for column in &self.columns {
            let clipped = column_f64(df, column)?
                .into_iter()
                .map(|v| v.map(|x| x.clamp(self.min, self.max)))
                .collect();
            result.with_column(float_series(column, clipped))?;
        }
        Ok(result)
    }
}
