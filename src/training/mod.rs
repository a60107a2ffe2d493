//! Model training module
//!
//! Provides the Random Forest classifier and everything around it:
//! - Binary decision trees and the parallel Random Forest
//! - Hyperparameter maps and their validation into forest settings
//! - The `Classifier` wrapper used by the workflows
//! - Classification metrics
//! - K-Fold and Stratified K-Fold cross-validation

mod config;
pub mod classifier;
pub mod cross_validation;
pub mod decision_tree;
pub mod hyperparameters;
pub mod metrics;
pub mod random_forest;

pub use classifier::Classifier;
pub use config::ModelConfig;
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use hyperparameters::{ForestSettings, HyperparameterValue, Hyperparameters};
pub use metrics::{ClassificationMetrics, Metric};
pub use random_forest::{MaxFeatures, RandomForest};
