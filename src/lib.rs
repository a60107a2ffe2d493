//! Binary Forest - Random Forest binary classification pipeline
//!
//! This crate trains and runs a binary classifier from a schema-described CSV
//! dataset:
//! - Schema loading and validation
//! - Schema-driven preprocessing pipeline, fitted on training rows only
//! - Parallel Random Forest estimator
//! - Bayesian hyperparameter tuning with cross-validation
//! - Persisted artifacts reused unchanged at prediction time
//!
//! # Modules
//!
//! - [`schema`] - Dataset schema (id, target, classes, features)
//! - [`data`] - CSV loading, row selection and input validation
//! - [`preprocessing`] - Preprocessing steps, target encoding, SMOTE
//! - [`training`] - Decision trees, Random Forest, metrics, cross-validation
//! - [`optimizer`] - Search spaces, Gaussian process sampler, tuner
//! - [`workflow`] - Training and batch prediction runs
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Inputs and layout
pub mod artifacts;
pub mod data;
pub mod paths;
pub mod schema;

// Core ML modules
pub mod optimizer;
pub mod preprocessing;
pub mod training;

// Runs
pub mod cli;
pub mod workflow;

pub use error::{ForestError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForestError, Result};

    // Inputs
    pub use crate::paths::{ConfigPaths, Paths};
    pub use crate::schema::{BinaryClassificationSchema, FeatureType};

    // Preprocessing
    pub use crate::preprocessing::{PreprocessingConfig, PreprocessingPipeline, TargetEncoder, Transform};

    // Training
    pub use crate::training::{
        Classifier, ClassificationMetrics, CrossValidator, CVStrategy, Hyperparameters, Metric,
        ModelConfig, RandomForest,
    };

    // Optimization
    pub use crate::optimizer::{HyperparameterTuner, SearchSpace, Study, TuningConfig};

    // Workflows
    pub use crate::workflow::{run_batch_predictions, run_training, TrainingSummary};
}
