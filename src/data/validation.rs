//! Validation of raw input frames against the schema

use super::{column_names, has_column};
use crate::error::{ForestError, Result};
use crate::schema::{BinaryClassificationSchema, FeatureType};
use polars::prelude::*;
use std::collections::HashSet;

/// Check a raw frame before any fitting or transforming.
///
/// Requires at least one row, a unique non-null id column and every schema
/// feature. Numeric features must hold numbers. Training data must also carry a
/// non-null target column. Missing columns are reported together.
pub fn validate_data(
    df: &DataFrame,
    schema: &BinaryClassificationSchema,
    is_train: bool,
) -> Result<()> {
    if df.height() == 0 {
        return Err(ForestError::ValidationError(
            "input data contains no rows".to_string(),
        ));
    }

    let mut required = vec![schema.id().to_string()];
    if is_train {
        required.push(schema.target().to_string());
    }
    required.extend(schema.features());

    let missing: Vec<String> = required
        .into_iter()
        .filter(|name| !has_column(df, name))
        .collect();
    if !missing.is_empty() {
        return Err(ForestError::ValidationError(format!(
            "missing required columns {:?} (found {:?})",
            missing,
            column_names(df)
        )));
    }

    validate_id_column(df, schema.id())?;

    if is_train {
        let nulls = df.column(schema.target())?.null_count();
        if nulls > 0 {
            return Err(ForestError::ValidationError(format!(
                "target column '{}' has {} missing values",
                schema.target(),
                nulls
            )));
        }
    }

    for feature in &schema.features {
        if feature.data_type == FeatureType::Numeric {
            validate_numeric_column(df, &feature.name)?;
        }
    }

    Ok(())
}

fn validate_id_column(df: &DataFrame, id: &str) -> Result<()> {
    let ids = df.column(id)?.as_materialized_series().cast(&DataType::String)?;
    let ids = ids.str()?;

    let mut seen = HashSet::with_capacity(ids.len());
    for value in ids.into_iter() {
        let value = value.ok_or_else(|| {
            ForestError::ValidationError(format!("id column '{}' contains missing values", id))
        })?;
        if !seen.insert(value) {
            return Err(ForestError::ValidationError(format!(
                "id column '{}' contains duplicate value '{}'",
                id, value
            )));
        }
    }
    Ok(())
}

fn validate_numeric_column(df: &DataFrame, name: &str) -> Result<()> {
    let series = df.column(name)?.as_materialized_series();
    match series.dtype() {
        DataType::String => {
            let bad = series
                .str()?
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|v| !v.is_empty() && v.parse::<f64>().is_err());
            match bad {
                Some(value) => Err(ForestError::ValidationError(format!(
                    "numeric feature '{}' contains non-numeric value '{}'",
                    name, value
                ))),
                None => Ok(()),
            }
        }
        DataType::Boolean => Err(ForestError::ValidationError(format!(
            "numeric feature '{}' has boolean values",
            name
        ))),
        DataType::Null => Ok(()),
        dtype if dtype.is_float() || dtype.is_integer() => Ok(()),
        dtype => Err(ForestError::ValidationError(format!(
            "numeric feature '{}' has unsupported type {}",
            name, dtype
        ))),
    }
}
