//! Binary target encoding

use crate::data::{column_str, has_column};
use crate::error::{ForestError, Result};
use crate::schema::BinaryClassificationSchema;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maps the two allowed class labels to 0 and 1.
///
/// The order of `classes` matters: `classes[0]` encodes as 0 and `classes[1]`
/// as 1, the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEncoder {
    target_field: String,
    classes: Vec<String>,
}

impl TargetEncoder {
    pub fn new(target_field: impl Into<String>, classes: Vec<String>) -> Result<Self> {
        if classes.len() != 2 || classes[0] == classes[1] {
            return Err(ForestError::InvalidParameter {
                name: "classes".to_string(),
                value: format!("{:?}", classes),
                reason: "exactly two distinct classes are required".to_string(),
            });
        }
        Ok(Self {
            target_field: target_field.into(),
            classes,
        })
    }

    pub fn from_schema(schema: &BinaryClassificationSchema) -> Result<Self> {
        Self::new(schema.target(), schema.allowed_target_values().to_vec())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn target_field(&self) -> &str {
        &self.target_field
    }

    /// Encode the target column.
    ///
    /// Returns `Ok(None)` when the frame has no target column. Fails when the
    /// observed labels are not exactly the two allowed classes.
    pub fn transform(&self, df: &DataFrame) -> Result<Option<Vec<usize>>> {
        if !has_column(df, &self.target_field) {
            return Ok(None);
        }

        let targets: Vec<String> = column_str(df, &self.target_field)?
            .into_iter()
            .map(|v| v.unwrap_or_default())
            .collect();

        let observed: BTreeSet<&str> = targets.iter().map(String::as_str).collect();
        if observed.len() != 2 {
            return Err(ForestError::ValidationError(format!(
                "expected two classes {:?}, found {} class(es) in target: {:?}",
                self.classes,
                observed.len(),
                observed
            )));
        }
        if !observed.iter().all(|c| self.classes.iter().any(|a| a == c)) {
            return Err(ForestError::ValidationError(format!(
                "observed target classes {:?} do not match allowed values {:?}",
                observed, self.classes
            )));
        }

        targets.iter().map(|t| self.encode(t)).collect::<Result<Vec<_>>>().map(Some)
    }

    fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| ForestError::ValidationError(format!("unknown class '{}'", label)))
    }

    /// Map encoded indices back to class labels
    pub fn inverse_transform(&self, encoded: &[usize]) -> Result<Vec<String>> {
        encoded
            .iter()
            .map(|&i| {
                self.classes.get(i).cloned().ok_or_else(|| {
                    ForestError::ValidationError(format!("encoded class {} out of range", i))
                })
            })
            .collect()
    }
}
