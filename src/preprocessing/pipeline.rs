//! Schema-driven preprocessing pipeline

use super::{
    config::PreprocessingConfig,
    encoder::{OneHotEncoder, RareLabelEncoder},
    imputer::{CategoricalImputer, MissingIndicator, NumericImputer},
    scaler::{StandardScaler, ValueClipper},
    selection::{ColumnSelector, ConstantFeatureDropper, CorrelatedFeatureDropper, TypeCaster},
    Transform,
};
use crate::artifacts::{load_artifact, save_artifact};
use crate::data::{column_f64, column_names, has_column};
use crate::error::{ForestError, Result};
use crate::schema::BinaryClassificationSchema;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// One fitted (or unfitted) pipeline step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PreprocessingStep {
    ColumnSelector(ColumnSelector),
    TypeCaster(TypeCaster),
    MissingIndicator(MissingIndicator),
    NumericImputer(NumericImputer),
    CategoricalImputer(CategoricalImputer),
    RareLabelEncoder(RareLabelEncoder),
    ConstantFeatureDropper(ConstantFeatureDropper),
    CorrelatedFeatureDropper(CorrelatedFeatureDropper),
    StandardScaler(StandardScaler),
    ValueClipper(ValueClipper),
    OneHotEncoder(OneHotEncoder),
}

impl PreprocessingStep {
    fn as_transform(&self) -> &dyn Transform {
        match self {
            Self::ColumnSelector(s) => s,
            Self::TypeCaster(s) => s,
            Self::MissingIndicator(s) => s,
            Self::NumericImputer(s) => s,
            Self::CategoricalImputer(s) => s,
            Self::RareLabelEncoder(s) => s,
            Self::ConstantFeatureDropper(s) => s,
            Self::CorrelatedFeatureDropper(s) => s,
            Self::StandardScaler(s) => s,
            Self::ValueClipper(s) => s,
            Self::OneHotEncoder(s) => s,
        }
    }

    fn as_transform_mut(&mut self) -> &mut dyn Transform {
        match self {
            Self::ColumnSelector(s) => s,
            Self::TypeCaster(s) => s,
            Self::MissingIndicator(s) => s,
            Self::NumericImputer(s) => s,
            Self::CategoricalImputer(s) => s,
            Self::RareLabelEncoder(s) => s,
            Self::ConstantFeatureDropper(s) => s,
            Self::CorrelatedFeatureDropper(s) => s,
            Self::StandardScaler(s) => s,
            Self::ValueClipper(s) => s,
            Self::OneHotEncoder(s) => s,
        }
    }

    pub fn name(&self) -> &'static str {
        self.as_transform().name()
    }
}

/// Ordered preprocessing steps plus the fitted output columns.
///
/// Fitted on training rows only and applied unchanged to validation and test
/// data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingPipeline {
    steps: Vec<PreprocessingStep>,
    output_columns: Vec<String>,
    is_fitted: bool,
}

impl PreprocessingPipeline {
    /// Build the step list for a schema. Steps with no columns to act on are
    /// left out.
    pub fn from_schema(schema: &BinaryClassificationSchema, config: &PreprocessingConfig) -> Self {
        let features = schema.features();
        let numeric = schema.numeric_features();
        let categorical = schema.categorical_features();

        let mut steps = vec![
            PreprocessingStep::ColumnSelector(ColumnSelector::new(features)),
            PreprocessingStep::TypeCaster(TypeCaster::new(numeric.clone(), categorical.clone())),
        ];

        if !numeric.is_empty() {
            if config.add_missing_indicator {
                steps.push(PreprocessingStep::MissingIndicator(MissingIndicator::new(
                    numeric.clone(),
                )));
            }
            steps.push(PreprocessingStep::NumericImputer(NumericImputer::new(
                config.imputation_method,
                numeric.clone(),
            )));
        }

        if !categorical.is_empty() {
            steps.push(PreprocessingStep::CategoricalImputer(CategoricalImputer::new(
                config.most_frequent_threshold,
                config.missing_tag.clone(),
                categorical.clone(),
            )));
            steps.push(PreprocessingStep::RareLabelEncoder(RareLabelEncoder::new(
                config.rare_label_tol,
                config.rare_label_n_categories,
                config.rare_label.clone(),
                categorical.clone(),
            )));
        }

        if config.drop_constant_features {
            steps.push(PreprocessingStep::ConstantFeatureDropper(ConstantFeatureDropper::new()));
        }
        if config.drop_correlated_features && numeric.len() > 1 {
            steps.push(PreprocessingStep::CorrelatedFeatureDropper(
                CorrelatedFeatureDropper::new(config.correlation_threshold, numeric.clone()),
            ));
        }

        if !numeric.is_empty() {
            steps.push(PreprocessingStep::StandardScaler(StandardScaler::new(numeric.clone())));
            steps.push(PreprocessingStep::ValueClipper(ValueClipper::new(
                config.clip_min,
                config.clip_max,
                numeric,
            )));
        }

        if !categorical.is_empty() {
            steps.push(PreprocessingStep::OneHotEncoder(OneHotEncoder::new(categorical)));
        }

        Self {
            steps,
            output_columns: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn steps(&self) -> &[PreprocessingStep] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(PreprocessingStep::name).collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted output column names, in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.output_columns
    }

    /// Fit every step in order on the training frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let start = Instant::now();
        let mut current = df.clone();
        for step in &mut self.steps {
            let step_start = Instant::now();
            current = step.as_transform_mut().fit_transform(&current)?;
            debug!(
                step = step.name(),
                columns = current.width(),
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "Fitted preprocessing step"
            );
        }

        let output_columns = column_names(&current);
        if output_columns.is_empty() {
            return Err(ForestError::PreprocessingError(
                "preprocessing removed every feature".to_string(),
            ));
        }
        for name in &output_columns {
            if current.column(name)?.dtype() != &DataType::Float64 {
                return Err(ForestError::PreprocessingError(format!(
                    "column '{}' is not numeric after preprocessing",
                    name
                )));
            }
        }

        self.output_columns = output_columns;
        self.is_fitted = true;
        debug!(
            rows = df.height(),
            features = self.output_columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted preprocessing pipeline"
        );
        Ok(())
    }

    /// Apply the fitted steps; output columns come back in fitted order
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ForestError::ModelNotFitted);
        }

        let mut current = df.clone();
        for step in &self.steps {
            current = step.as_transform().transform(&current)?;
        }

        let missing: Vec<&String> = self
            .output_columns
            .iter()
            .filter(|c| !has_column(&current, c))
            .collect();
        if !missing.is_empty() {
            return Err(ForestError::PreprocessingError(format!(
                "transformed data lacks fitted columns {:?}",
                missing
            )));
        }
        Ok(current.select(self.output_columns.iter().map(String::as_str))?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Transform and convert to a dense row-major feature matrix
    pub fn to_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let transformed = self.transform(df)?;
        frame_to_matrix(&transformed, &self.output_columns)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_artifact(self, path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_artifact(path)
    }
}

/// Dense `f64` matrix of `columns`; any remaining null is an error
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut matrix = Array2::<f64>::zeros((df.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        let values = column_f64(df, name)?
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| {
                    ForestError::PreprocessingError(format!(
                        "column '{}' has missing values after preprocessing",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        matrix.column_mut(j).assign(&Array1::from(values));
    }
    Ok(matrix)
}
