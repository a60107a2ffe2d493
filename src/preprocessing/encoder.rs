//! Categorical encoders

use super::{check_generated_names, float_series, present_columns, string_series, Transform};
use crate::data::column_str;
use crate::error::{ForestError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Groups infrequent categories under a single rare label.
///
/// Categories seen during fit with a relative frequency below `tol` are rare.
/// Categories never seen during fit are rare as well.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RareLabelEncoder {
    tol: f64,
    n_categories: usize,
    rare_label: String,
    candidates: Vec<String>,
    /// Sorted frequent categories per column
    frequent: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl RareLabelEncoder {
    pub fn new(
        tol: f64,
        n_categories: usize,
        rare_label: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self {
            tol,
            n_categories,
            rare_label: rare_label.into(),
            candidates,
            frequent: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn frequent_categories(&self, column: &str) -> Option<&[String]> {
        self.frequent
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, cats)| cats.as_slice())
    }
}

impl Transform for RareLabelEncoder {
    fn name(&self) -> &'static str {
        "rare_label_encoder"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.frequent.clear();
        for col in present_columns(df, &self.candidates) {
            let values = column_str(df, &col)?;
            let total = values.len().max(1) as f64;

            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for v in values.into_iter().flatten() {
                *counts.entry(v).or_insert(0) += 1;
            }

            let group = counts.len() >= self.n_categories;
            let frequent: Vec<String> = counts
                .into_iter()
                .filter(|(_, count)| !group || *count as f64 / total >= self.tol)
                .map(|(cat, _)| cat)
                .collect();
            self.frequent.push((col, frequent));
        }
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col, frequent) in &self.frequent {
            let encoded = column_str(df, col)?
                .into_iter()
                .map(|v| match v {
                    Some(s) if frequent.binary_search(&s).is_ok() => Some(s),
                    Some(_) => Some(self.rare_label.clone()),
                    None => None,
                })
                .collect();
            result.with_column(string_series(col, encoded))?;
        }
        Ok(result)
    }
}

/// Replaces each categorical column with one 0/1 column per category seen in
/// fit, named `<col>_<category>` in sorted category order. Unknown categories
/// encode as all zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    candidates: Vec<String>,
    categories: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            categories: Vec::new(),
            is_fitted: false,
        }
    }

    /// Output column names in order
    pub fn output_columns(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|(col, cats)| cats.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }
}

impl Transform for OneHotEncoder {
    fn name(&self) -> &'static str {
        "one_hot_encoder"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.categories.clear();
        for col in present_columns(df, &self.candidates) {
            let mut cats: Vec<String> = column_str(df, &col)?.into_iter().flatten().collect();
            cats.sort();
            cats.dedup();
            self.categories.push((col, cats));
        }

        let replaced: Vec<String> = self.categories.iter().map(|(col, _)| col.clone()).collect();
        let generated = self.output_columns();
        check_generated_names(self.name(), df, &replaced, generated.iter().map(String::as_str))?;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col, cats) in &self.categories {
            let values = column_str(df, col)?;
            result = result.drop(col)?;
            for cat in cats {
                let flags = values
                    .iter()
                    .map(|v| Some(if v.as_deref() == Some(cat.as_str()) { 1.0 } else { 0.0 }))
                    .collect();
                result.with_column(float_series(&format!("{}_{}", col, cat), flags))?;
            }
        }
        Ok(result)
    }
}
