//! Missing value indicators and imputation

use super::config::ImputationMethod;
use super::{check_generated_names, float_series, present_columns, string_series, Transform};
use crate::data::{column_f64, column_str};
use crate::error::{ForestError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Adds a `<col>_is_missing` 0/1 column for every numeric column that had
/// missing values during fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingIndicator {
    candidates: Vec<String>,
    columns: Vec<String>,
    is_fitted: bool,
}

impl MissingIndicator {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            columns: Vec::new(),
            is_fitted: false,
        }
    }

    /// Columns that receive an indicator
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn indicator_name(column: &str) -> String {
        format!("{}_is_missing", column)
    }
}

impl Transform for MissingIndicator {
    fn name(&self) -> &'static str {
        "missing_indicator"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.columns.clear();
        for col in present_columns(df, &self.candidates) {
            if column_f64(df, &col)?.iter().any(Option::is_none) {
                self.columns.push(col);
            }
        }

        let generated: Vec<String> = self.columns.iter().map(|c| Self::indicator_name(c)).collect();
        check_generated_names(self.name(), df, &[], generated.iter().map(String::as_str))?;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for col in &self.columns {
            let flags = column_f64(df, col)?
                .into_iter()
                .map(|v| Some(if v.is_none() { 1.0 } else { 0.0 }))
                .collect();
            result.with_column(float_series(&Self::indicator_name(col), flags))?;
        }
        Ok(result)
    }
}

/// Fills missing numeric values with the training mean or median
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericImputer {
    method: ImputationMethod,
    candidates: Vec<String>,
    fill_values: Vec<(String, f64)>,
    is_fitted: bool,
}

impl NumericImputer {
    pub fn new(method: ImputationMethod, candidates: Vec<String>) -> Self {
        Self {
            method,
            candidates,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn fill_value(&self, column: &str) -> Option<f64> {
        self.fill_values
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| *v)
    }

    fn compute_fill_value(&self, values: &[Option<f64>]) -> f64 {
        let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
        if observed.is_empty() {
            return 0.0;
        }
        match self.method {
            ImputationMethod::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
            ImputationMethod::Median => {
                observed.sort_by(|a, b| a.total_cmp(b));
                let mid = observed.len() / 2;
                if observed.len() % 2 == 0 {
                    (observed[mid - 1] + observed[mid]) / 2.0
                } else {
                    observed[mid]
                }
            }
        }
    }
}

impl Transform for NumericImputer {
    fn name(&self) -> &'static str {
        "numeric_imputer"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.fill_values.clear();
        for col in present_columns(df, &self.candidates) {
            let values = column_f64(df, &col)?;
            let fill = self.compute_fill_value(&values);
            self.fill_values.push((col, fill));
        }
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col, fill) in &self.fill_values {
            let filled = column_f64(df, col)?
                .into_iter()
                .map(|v| Some(v.unwrap_or(*fill)))
                .collect();
            result.with_column(float_series(col, filled))?;
        }
        Ok(result)
    }
}

/// Fills missing categorical values.
///
/// Columns whose missing fraction is below the threshold get their most
/// frequent value; the rest get the missing tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalImputer {
    threshold: f64,
    missing_tag: String,
    candidates: Vec<String>,
    fill_values: Vec<(String, String)>,
    is_fitted: bool,
}

impl CategoricalImputer {
    pub fn new(threshold: f64, missing_tag: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            threshold,
            missing_tag: missing_tag.into(),
            candidates,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn fill_value(&self, column: &str) -> Option<&str> {
        self.fill_values
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    fn compute_fill_value(&self, values: &[Option<String>]) -> String {
        if values.is_empty() {
            return self.missing_tag.clone();
        }
        let missing = values.iter().filter(|v| v.is_none()).count();
        let missing_fraction = missing as f64 / values.len() as f64;
        if missing_fraction >= self.threshold {
            return self.missing_tag.clone();
        }
        most_frequent(values).unwrap_or_else(|| self.missing_tag.clone())
    }
}

/// Most frequent non-null value; ties go to the lexicographically smallest
fn most_frequent(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
}

impl Transform for CategoricalImputer {
    fn name(&self) -> &'static str {
        "categorical_imputer"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.fill_values.clear();
        for col in present_columns(df, &self.candidates) {
            let values = column_str(df, &col)?;
            let fill = self.compute_fill_value(&values);
            self.fill_values.push((col, fill));
        }
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col, fill) in &self.fill_values {
            let filled = column_str(df, col)?
                .into_iter()
                .map(|v| Some(v.unwrap_or_else(|| fill.clone())))
                .collect();
            result.with_column(string_series(col, filled))?;
        }
        Ok(result)
    }
}
