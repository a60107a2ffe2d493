//! Directory layout for inputs, artifacts and outputs

use std::path::{Path, PathBuf};

/// Default root holding inputs, model artifacts and outputs
pub const DEFAULT_ROOT: &str = "model_inputs_outputs";

/// Default directory holding the JSON configuration files
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// All filesystem locations used by a run, derived from a single root
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub schema_dir: PathBuf,
    pub train_dir: PathBuf,
    pub test_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub saved_schema_path: PathBuf,
    pub pipeline_path: PathBuf,
    pub target_encoder_path: PathBuf,
    pub predictor_path: PathBuf,
    pub training_summary_path: PathBuf,
    pub hpt_results_path: PathBuf,
    pub predictions_path: PathBuf,
    pub errors_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl Paths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let inputs = root.join("inputs");
        let artifacts_dir = root.join("model").join("artifacts");
        let outputs = root.join("outputs");

        Self {
            schema_dir: inputs.join("schema"),
            train_dir: inputs.join("data").join("training"),
            test_dir: inputs.join("data").join("testing"),
            saved_schema_path: artifacts_dir.join("saved_schema.json"),
            pipeline_path: artifacts_dir.join("preprocessing_pipeline.bin"),
            target_encoder_path: artifacts_dir.join("target_encoder.bin"),
            predictor_path: artifacts_dir.join("predictor.bin"),
            training_summary_path: artifacts_dir.join("training_summary.json"),
            hpt_results_path: outputs.join("hpt_outputs").join("hpt_results.csv"),
            predictions_path: outputs.join("predictions").join("predictions.csv"),
            errors_dir: outputs.join("errors"),
            artifacts_dir,
            root,
        }
    }

    /// `outputs/errors/<command>_error.txt`
    pub fn error_file(&self, command: &str) -> PathBuf {
        self.errors_dir.join(format!("{}_error.txt", command))
    }
}

/// Locations of the four configuration files
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub model_config: PathBuf,
    pub default_hyperparameters: PathBuf,
    pub hpt: PathBuf,
    pub preprocessing: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

impl ConfigPaths {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model_config: dir.join("model_config.json"),
            default_hyperparameters: dir.join("default_hyperparameters.json"),
            hpt: dir.join("hpt.json"),
            preprocessing: dir.join("preprocessing.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = Paths::new("/tmp/run");
        assert_eq!(paths.schema_dir, PathBuf::from("/tmp/run/inputs/schema"));
        assert_eq!(
            paths.predictor_path,
            PathBuf::from("/tmp/run/model/artifacts/predictor.bin")
        );
        assert_eq!(
            paths.error_file("train"),
            PathBuf::from("/tmp/run/outputs/errors/train_error.txt")
        );
    }

    #[test]
    fn test_config_paths() {
        let config = ConfigPaths::new("cfg");
        assert_eq!(config.hpt, PathBuf::from("cfg/hpt.json"));
    }
}
