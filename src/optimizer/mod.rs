//! Hyperparameter optimization module
//!
//! Bayesian optimization of Random Forest hyperparameters:
//! - Search spaces declared in `hpt.json`
//! - Gaussian Process surrogate with expected improvement
//! - A tuner driving cross-validated trials and recording them in a `Study`

mod config;
mod search_space;
pub mod gaussian_process;
pub mod tuner;

pub use config::{ParameterKind, ParameterSpec, SearchType, TuningConfig};
pub use gaussian_process::{GPSampler, GaussianProcess};
pub use search_space::{Parameter, ParameterType, SearchSpace};
pub use tuner::{HyperparameterTuner, Study, TrialResult, TrialStatus};
