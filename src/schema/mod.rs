//! Binary classification data schema
//!
//! The schema is a JSON document naming the id field, the target field with its
//! two allowed classes, and the typed feature list. It is loaded once per run,
//! validated before any data is touched, and copied into the artifacts directory
//! so prediction runs against exactly the schema the model was trained with.

use crate::error::{ForestError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const MODEL_CATEGORY: &str = "binary_classification";
const SCHEMA_VERSION: f64 = 1.0;
const INPUT_DATA_FORMAT: &str = "CSV";

/// Data type of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureType {
    Numeric,
    Categorical,
}

/// The id column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdField {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The target column and its two classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetField {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_labels")]
    pub classes: Vec<String>,
}

/// A single feature column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureField {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_type: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_labels",
        skip_serializing_if = "Option::is_none"
    )]
    pub categories: Option<Vec<String>>,
}

fn default_nullable() -> bool {
    true
}

/// Class and category labels may be written as JSON strings, numbers or booleans;
/// they are compared as strings everywhere else.
fn label_to_string(value: serde_json::Value) -> std::result::Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("unsupported label value: {}", other)),
    }
}

fn deserialize_labels<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(|v| label_to_string(v).map_err(serde::de::Error::custom))
        .collect()
}

fn deserialize_optional_labels<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    values
        .map(|vals| {
            vals.into_iter()
                .map(|v| label_to_string(v).map_err(serde::de::Error::custom))
                .collect()
        })
        .transpose()
}

/// Validated schema for a binary classification dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryClassificationSchema {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub model_category: String,
    pub schema_version: f64,
    pub input_data_format: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    pub id: IdField,
    pub target: TargetField,
    pub features: Vec<FeatureField>,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

impl BinaryClassificationSchema {
    /// Parse and validate a schema document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)
            .map_err(|e| ForestError::SchemaError(format!("invalid schema document: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a previously saved schema (e.g. from the artifacts directory)
    pub fn load_saved(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ForestError::SchemaError(format!("cannot read schema {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Save the schema as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every structural rule; the first violation is returned
    pub fn validate(&self) -> Result<()> {
        if self.model_category != MODEL_CATEGORY {
            return Err(ForestError::SchemaError(format!(
                "modelCategory must be '{}', found '{}'",
                MODEL_CATEGORY, self.model_category
            )));
        }
        if (self.schema_version - SCHEMA_VERSION).abs() > f64::EPSILON {
            return Err(ForestError::SchemaError(format!(
                "unsupported schemaVersion {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            )));
        }
        if self.input_data_format != INPUT_DATA_FORMAT {
            return Err(ForestError::SchemaError(format!(
                "inputDataFormat must be '{}', found '{}'",
                INPUT_DATA_FORMAT, self.input_data_format
            )));
        }
        let encoding = self.encoding.to_lowercase().replace('_', "-");
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(ForestError::SchemaError(format!(
                "encoding must be utf-8, found '{}'",
                self.encoding
            )));
        }

        if self.id.name.trim().is_empty() {
            return Err(ForestError::SchemaError("id field name is empty".to_string()));
        }
        if self.target.name.trim().is_empty() {
            return Err(ForestError::SchemaError("target field name is empty".to_string()));
        }
        if self.id.name == self.target.name {
            return Err(ForestError::SchemaError(format!(
                "id and target must be different fields, both are '{}'",
                self.id.name
            )));
        }

        let classes = &self.target.classes;
        if classes.len() != 2 {
            return Err(ForestError::SchemaError(format!(
                "target must declare exactly two classes, found {}: {:?}",
                classes.len(),
                classes
            )));
        }
        if classes[0] == classes[1] {
            return Err(ForestError::SchemaError(format!(
                "target classes must be distinct, found {:?}",
                classes
            )));
        }

        if self.features.is_empty() {
            return Err(ForestError::SchemaError("schema declares no features".to_string()));
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name.trim().is_empty() {
                return Err(ForestError::SchemaError("feature with empty name".to_string()));
            }
            if feature.name == self.id.name || feature.name == self.target.name {
                return Err(ForestError::SchemaError(format!(
                    "feature '{}' clashes with the id or target field",
                    feature.name
                )));
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(ForestError::SchemaError(format!(
                    "duplicate feature name '{}'",
                    feature.name
                )));
            }
            match feature.data_type {
                FeatureType::Categorical => {
                    let has_categories = feature
                        .categories
                        .as_ref()
                        .map_or(false, |c| !c.is_empty());
                    if !has_categories {
                        return Err(ForestError::SchemaError(format!(
                            "categorical feature '{}' must declare a non-empty 'categories' list",
                            feature.name
                        )));
                    }
                }
                FeatureType::Numeric => {
                    if let Some(example) = &feature.example {
                        if !example.is_number() && !example.is_null() {
                            return Err(ForestError::SchemaError(format!(
                                "numeric feature '{}' has a non-numeric example: {}",
                                feature.name, example
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Name of the id column
    pub fn id(&self) -> &str {
        &self.id.name
    }

    /// Name of the target column
    pub fn target(&self) -> &str {
        &self.target.name
    }

    /// The two class labels; index 0 encodes to 0, index 1 to 1
    pub fn allowed_target_values(&self) -> &[String] {
        &self.target.classes
    }

    /// The class encoded as 1
    pub fn positive_class(&self) -> &str {
        &self.target.classes[1]
    }

    /// All feature names in declaration order
    pub fn features(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    pub fn numeric_features(&self) -> Vec<String> {
        self.features_of_type(FeatureType::Numeric)
    }

    pub fn categorical_features(&self) -> Vec<String> {
        self.features_of_type(FeatureType::Categorical)
    }

    fn features_of_type(&self, data_type: FeatureType) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.data_type == data_type)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Id, target and features
    pub fn all_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.features.len() + 2);
        fields.push(self.id.name.clone());
        fields.push(self.target.name.clone());
        fields.extend(self.features());
        fields
    }

    /// Declared categories of a categorical feature
    pub fn categories_of(&self, feature: &str) -> Option<&[String]> {
        self.features
            .iter()
            .find(|f| f.name == feature)
            .and_then(|f| f.categories.as_deref())
    }

    pub fn target_description(&self) -> &str {
        &self.target.description
    }

    pub fn id_description(&self) -> &str {
        &self.id.description
    }
}

/// Load and validate the single `.json` schema file inside `dir`
pub fn load_json_schema(dir: impl AsRef<Path>) -> Result<BinaryClassificationSchema> {
    let path = find_single_file(dir.as_ref(), "json")
        .map_err(|e| ForestError::SchemaError(e.to_string()))?;
    let json = std::fs::read_to_string(&path)?;
    BinaryClassificationSchema::from_json_str(&json)
}

/// Locate the only file with `extension` in `dir`
pub(crate) fn find_single_file(dir: &Path, extension: &str) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ForestError::DataError(format!("cannot read directory {}: {}", dir.display(), e))
    })?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case(extension))
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => Err(ForestError::DataError(format!(
            "no .{} file found in {}",
            extension,
            dir.display()
        ))),
        1 => Ok(matches.remove(0)),
        n => Err(ForestError::DataError(format!(
            "expected exactly one .{} file in {}, found {}",
            extension,
            dir.display(),
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_json() -> String {
        r#"{
            "title": "Churn",
            "description": "Customer churn",
            "modelCategory": "binary_classification",
            "schemaVersion": 1.0,
            "inputDataFormat": "CSV",
            "encoding": "utf-8",
            "id": {"name": "customer_id", "description": "row id"},
            "target": {"name": "churned", "description": "did they leave", "classes": ["no", "yes"]},
            "features": [
                {"name": "tenure", "dataType": "NUMERIC", "example": 12.0},
                {"name": "plan", "dataType": "CATEGORICAL", "categories": ["basic", "pro"]},
                {"name": "spend", "dataType": "NUMERIC", "example": 99.5, "nullable": false}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_valid_schema() {
        let schema = BinaryClassificationSchema::from_json_str(&schema_json()).unwrap();
        assert_eq!(schema.id(), "customer_id");
        assert_eq!(schema.target(), "churned");
        assert_eq!(schema.allowed_target_values(), &["no".to_string(), "yes".to_string()]);
        assert_eq!(schema.positive_class(), "yes");
        assert_eq!(schema.numeric_features(), vec!["tenure", "spend"]);
        assert_eq!(schema.categorical_features(), vec!["plan"]);
        assert_eq!(schema.features(), vec!["tenure", "plan", "spend"]);
        assert_eq!(schema.all_fields().len(), 5);
        assert!(schema.features[0].nullable);
        assert!(!schema.features[2].nullable);
    }

    #[test]
    fn test_numeric_class_labels_become_strings() {
        let json = schema_json().replace(r#"["no", "yes"]"#, "[0, 1]");
        let schema = BinaryClassificationSchema::from_json_str(&json).unwrap();
        assert_eq!(schema.allowed_target_values(), &["0".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_missing_target_fails() {
        let json = r#"{
            "modelCategory": "binary_classification",
            "schemaVersion": 1.0,
            "inputDataFormat": "CSV",
            "id": {"name": "id"},
            "features": [{"name": "x", "dataType": "NUMERIC"}]
        }"#;
        let err = BinaryClassificationSchema::from_json_str(json).unwrap_err();
        assert!(matches!(err, ForestError::SchemaError(_)));
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_three_classes_rejected() {
        let json = schema_json().replace(r#"["no", "yes"]"#, r#"["a", "b", "c"]"#);
        let err = BinaryClassificationSchema::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("exactly two classes"));
    }

    #[test]
    fn test_wrong_model_category_rejected() {
        let json = schema_json().replace("binary_classification", "regression");
        assert!(BinaryClassificationSchema::from_json_str(&json).is_err());
    }

    #[test]
    fn test_unknown_data_type_rejected() {
        let json = schema_json().replace(r#""dataType": "CATEGORICAL""#, r#""dataType": "TEXT""#);
        assert!(BinaryClassificationSchema::from_json_str(&json).is_err());
    }

    #[test]
    fn test_categorical_without_categories_rejected() {
        let json = schema_json().replace(r#", "categories": ["basic", "pro"]"#, "");
        let err = BinaryClassificationSchema::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("plan"));
    }

    #[test]
    fn test_duplicate_feature_rejected() {
        let json = schema_json().replace(r#""name": "spend""#, r#""name": "tenure""#);
        let err = BinaryClassificationSchema::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_feature_named_like_target_rejected() {
        let json = schema_json().replace(r#""name": "spend""#, r#""name": "churned""#);
        assert!(BinaryClassificationSchema::from_json_str(&json).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let schema = BinaryClassificationSchema::from_json_str(&schema_json()).unwrap();
        let path = dir.path().join("artifacts").join("saved_schema.json");
        schema.save(&path).unwrap();

        let reloaded = BinaryClassificationSchema::load_saved(&path).unwrap();
        assert_eq!(reloaded.features(), schema.features());
        assert_eq!(reloaded.allowed_target_values(), schema.allowed_target_values());
    }

    #[test]
    fn test_load_json_schema_requires_single_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_json_schema(dir.path()).is_err());

        std::fs::write(dir.path().join("schema.json"), schema_json()).unwrap();
        assert!(load_json_schema(dir.path()).is_ok());

        std::fs::write(dir.path().join("other.json"), schema_json()).unwrap();
        let err = load_json_schema(dir.path()).unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }
}
