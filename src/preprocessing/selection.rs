//! Column selection, type casting and feature dropping

use super::{float_series, present_columns, string_series, Transform};
use crate::data::{column_f64, column_names, column_str, has_column};
use crate::error::{ForestError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Keeps only the given columns, in the given order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSelector {
    columns: Vec<String>,
}

impl ColumnSelector {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn check_present(&self, df: &DataFrame) -> Result<()> {
        let missing: Vec<&String> = self.columns.iter().filter(|c| !has_column(df, c)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ForestError::FeatureNotFound(format!("{:?}", missing)))
        }
    }
}

impl Transform for ColumnSelector {
    fn name(&self) -> &'static str {
        "column_selector"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.check_present(df)
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.check_present(df)?;
        Ok(df.select(self.columns.iter().map(String::as_str))?)
    }
}

/// Casts numeric columns to `f64` and categorical columns to strings.
///
/// Numeric strings are parsed strictly: a value that is present but not a
/// number is an error rather than a silent null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeCaster {
    numeric: Vec<String>,
    categorical: Vec<String>,
}

impl TypeCaster {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    fn cast_numeric(df: &DataFrame, name: &str) -> Result<Series> {
        let series = df.column(name)?.as_materialized_series();
        if series.dtype() == &DataType::String {
            let parsed = series
                .str()?
                .into_iter()
                .map(|v| match v {
                    None => Ok(None),
                    Some(s) if s.trim().is_empty() => Ok(None),
                    Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
                        ForestError::PreprocessingError(format!(
                            "cannot cast value '{}' of column '{}' to a number",
                            s, name
                        ))
                    }),
                })
                .collect::<Result<Vec<Option<f64>>>>()?;
            Ok(float_series(name, parsed))
        } else {
            Ok(series.cast(&DataType::Float64)?)
        }
    }
}

impl Transform for TypeCaster {
    fn name(&self) -> &'static str {
        "type_caster"
    }

    fn fit(&mut self, _df: &DataFrame) -> Result<()> {
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for name in present_columns(df, &self.numeric) {
            result.with_column(Self::cast_numeric(df, &name)?)?;
        }
        for name in present_columns(df, &self.categorical) {
            result.with_column(string_series(&name, column_str(df, &name)?))?;
        }
        Ok(result)
    }
}

/// Drops columns holding a single value in the training data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantFeatureDropper {
    dropped: Vec<String>,
    is_fitted: bool,
}

impl Default for ConstantFeatureDropper {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantFeatureDropper {
    pub fn new() -> Self {
        Self {
            dropped: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    fn is_constant(df: &DataFrame, name: &str) -> Result<bool> {
        let dtype = df.column(name)?.dtype().clone();
        if dtype.is_float() || dtype.is_integer() {
            let values = column_f64(df, name)?;
            Ok(values.windows(2).all(|w| w[0] == w[1]))
        } else {
            let values = column_str(df, name)?;
            Ok(values.windows(2).all(|w| w[0] == w[1]))
        }
    }
}

impl Transform for ConstantFeatureDropper {
    fn name(&self) -> &'static str {
        "constant_feature_dropper"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let columns = column_names(df);
        let mut dropped = Vec::new();
        for name in &columns {
            if Self::is_constant(df, name)? {
                dropped.push(name.clone());
            }
        }

        if !columns.is_empty() && dropped.len() == columns.len() {
            warn!("Every feature is constant in the training data; keeping all of them");
            dropped.clear();
        }
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Dropping constant features");
        }

        self.dropped = dropped;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }
        let keep: Vec<String> = column_names(df)
            .into_iter()
            .filter(|c| !self.dropped.contains(c))
            .collect();
        Ok(df.select(keep)?)
    }
}

/// Drops the later column of every numeric pair whose absolute Pearson
/// correlation exceeds the threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedFeatureDropper {
    threshold: f64,
    candidates: Vec<String>,
    dropped: Vec<String>,
    is_fitted: bool,
}

impl CorrelatedFeatureDropper {
    pub fn new(threshold: f64, candidates: Vec<String>) -> Self {
        Self {
            threshold,
            candidates,
            dropped: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

/// Pearson correlation; `None` when either side has zero variance
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

impl Transform for CorrelatedFeatureDropper {
    fn name(&self) -> &'static str {
        "correlated_feature_dropper"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let columns = present_columns(df, &self.candidates);
        let values: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| {
                column_f64(df, c).map(|v| v.into_iter().map(|x| x.unwrap_or(0.0)).collect())
            })
            .collect::<Result<_>>()?;

        let mut kept: Vec<usize> = Vec::new();
        let mut dropped = Vec::new();
        for j in 0..columns.len() {
            let correlated = kept.iter().any(|&i| {
                pearson(&values[i], &values[j]).map_or(false, |r| r.abs() > self.threshold)
            });
            if correlated {
                dropped.push(columns[j].clone());
            } else {
                kept.push(j);
            }
        }
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Dropping correlated features");
        }

        self.dropped = dropped;
        self.is_fitted = true;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }
        let keep: Vec<String> = column_names(df)
            .into_iter()
            .filter(|c| !self.dropped.contains(c))
            .collect();
        Ok(df.select(keep)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_orders_and_requires_columns() {
        let df = df! { "b" => [1.0], "a" => [2.0], "extra" => [3.0] }.unwrap();
        let mut selector = ColumnSelector::new(vec!["a".to_string(), "b".to_string()]);
        let out = selector.fit_transform(&df).unwrap();
        assert_eq!(column_names(&out), vec!["a", "b"]);

        let missing = df! { "a" => [1.0] }.unwrap();
        assert!(matches!(
            selector.transform(&missing),
            Err(ForestError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_type_caster_strict_numeric() {
        let df = df! {
            "n" => [Some("1.5"), None, Some(" 2 ")],
            "c" => [1i64, 2, 3],
        }
        .unwrap();
        let caster = TypeCaster::new(vec!["n".to_string()], vec!["c".to_string()]);
        let out = caster.transform(&df).unwrap();
        assert_eq!(out.column("n").unwrap().dtype(), &DataType::Float64);
        assert_eq!(column_f64(&out, "n").unwrap(), vec![Some(1.5), None, Some(2.0)]);
        assert_eq!(out.column("c").unwrap().dtype(), &DataType::String);

        let bad = df! { "n" => ["1.0", "oops"], "c" => [1i64, 2] }.unwrap();
        assert!(caster.transform(&bad).is_err());
    }

    #[test]
    fn test_constant_features_dropped() {
        let df = df! {
            "a" => [1.0, 1.0, 1.0],
            "b" => [1.0, 2.0, 3.0],
            "c" => ["x", "x", "x"],
        }
        .unwrap();
        let mut dropper = ConstantFeatureDropper::new();
        let out = dropper.fit_transform(&df).unwrap();
        assert_eq!(column_names(&out), vec!["b"]);
        assert_eq!(dropper.dropped(), &["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_all_constant_keeps_everything() {
        let df = df! { "a" => [1.0, 1.0] }.unwrap();
        let mut dropper = ConstantFeatureDropper::new();
        let out = dropper.fit_transform(&df).unwrap();
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn test_correlated_later_column_dropped() {
        let df = df! {
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => [2.0, 4.1, 6.0, 8.2, 10.0],
            "c" => [5.0, 1.0, 4.0, 2.0, 3.0],
        }
        .unwrap();
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut dropper = CorrelatedFeatureDropper::new(0.95, names);
        let out = dropper.fit_transform(&df).unwrap();
        assert_eq!(dropper.dropped(), &["b".to_string()]);
        assert_eq!(column_names(&out), vec!["a", "c"]);
    }

    #[test]
    fn test_pearson_undefined_for_constant() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }
}
