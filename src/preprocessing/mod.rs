//! Data preprocessing module
//!
//! Provides the schema-driven preprocessing pipeline:
//! - Column selection and strict type casting
//! - Missing value indicators and imputation
//! - Rare label grouping and one-hot encoding
//! - Constant and correlated feature removal
//! - Standard scaling with value clipping
//!
//! plus the target encoder and SMOTE class balancing used around it.

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;
mod selection;
pub mod balancing;
pub mod target_encoder;

pub use balancing::Smote;
pub use config::{BalancingConfig, ImputationMethod, PreprocessingConfig};
pub use encoder::{OneHotEncoder, RareLabelEncoder};
pub use imputer::{CategoricalImputer, MissingIndicator, NumericImputer};
pub use pipeline::{PreprocessingPipeline, PreprocessingStep};
pub use scaler::{StandardScaler, ValueClipper};
pub use selection::{ColumnSelector, ConstantFeatureDropper, CorrelatedFeatureDropper, TypeCaster};
pub use target_encoder::TargetEncoder;

use crate::data::{column_names, has_column};
use crate::error::{ForestError, Result};
use polars::prelude::*;
use std::collections::HashSet;

/// A fittable frame-to-frame transformation
pub trait Transform {
    /// Short step name used in logs
    fn name(&self) -> &'static str;

    /// Learn parameters from training data
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    /// Apply learned parameters
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

/// Candidate columns that are present in `df`, keeping candidate order
pub(crate) fn present_columns(df: &DataFrame, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| has_column(df, c))
        .cloned()
        .collect()
}

/// Fail when a generated column name would replace an existing column or
/// another generated one. `replaced` columns are dropped by the step and free.
pub(crate) fn check_generated_names<'a>(
    step: &str,
    df: &DataFrame,
    replaced: &[String],
    generated: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut taken: HashSet<String> = column_names(df)
        .into_iter()
        .filter(|c| !replaced.contains(c))
        .collect();
    for name in generated {
        if !taken.insert(name.to_string()) {
            return Err(ForestError::PreprocessingError(format!(
                "{} would create column '{}', which already exists",
                step, name
            )));
        }
    }
    Ok(())
}

pub(crate) fn float_series(name: &str, values: Vec<Option<f64>>) -> Series {
    Series::new(name.into(), values)
}

pub(crate) fn string_series(name: &str, values: Vec<Option<String>>) -> Series {
    Series::new(name.into(), values)
}
