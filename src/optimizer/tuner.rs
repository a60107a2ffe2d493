//! Hyperparameter tuner: Bayesian search with a cross-validated objective

use super::config::TuningConfig;
use super::gaussian_process::GPSampler;
use super::search_space::SearchSpace;
use crate::data::write_csv;
use crate::error::{ForestError, Result};
use crate::training::{CVResults, Hyperparameters, Metric};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Complete,
    Failed,
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialStatus::Complete => f.write_str("COMPLETE"),
            TrialStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// 1-based trial number
    pub trial_id: usize,
    pub params: Hyperparameters,
    /// Mean cross-validated score; NaN for failed trials
    pub mean_score: f64,
    pub score_std: f64,
    pub fold_scores: Vec<f64>,
    pub duration_secs: f64,
    pub status: TrialStatus,
    pub error: Option<String>,
}

/// Study containing all trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Study {
    pub trials: Vec<TrialResult>,
    best_trial_idx: Option<usize>,
    pub total_duration_secs: f64,
    pub metric: Metric,
    param_names: Vec<String>,
}

impl Study {
    pub fn new(metric: Metric, param_names: Vec<String>) -> Self {
        Self {
            trials: Vec::new(),
            best_trial_idx: None,
            total_duration_secs: 0.0,
            metric,
            param_names,
        }
    }

    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.map(|idx| &self.trials[idx])
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_trial().map(|t| t.mean_score)
    }

    pub fn best_params(&self) -> Option<&Hyperparameters> {
        self.best_trial().map(|t| &t.params)
    }

    pub fn n_complete(&self) -> usize {
        self.trials
            .iter()
            .filter(|t| t.status == TrialStatus::Complete)
            .count()
    }

    /// Add a trial; the first trial reaching the highest score stays best
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();
        let is_better = result.status == TrialStatus::Complete
            && match self.best_score() {
                None => true,
                Some(best) => result.mean_score > best,
            };
        if is_better {
            self.best_trial_idx = Some(idx);
        }
        self.trials.push(result);
    }

    /// Trials ordered by score, best first; failed trials last
    pub fn sorted_trials(&self) -> Vec<&TrialResult> {
        let mut trials: Vec<&TrialResult> = self.trials.iter().collect();
        trials.sort_by(|a, b| match (a.status, b.status) {
            (TrialStatus::Complete, TrialStatus::Failed) => Ordering::Less,
            (TrialStatus::Failed, TrialStatus::Complete) => Ordering::Greater,
            _ => b
                .mean_score
                .total_cmp(&a.mean_score)
                .then(a.trial_id.cmp(&b.trial_id)),
        });
        trials
    }

    /// Results table, one row per trial, best first
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let trials = self.sorted_trials();

        let mut columns: Vec<Column> = Vec::with_capacity(self.param_names.len() + 5);
        let ids: Vec<u32> = trials.iter().map(|t| t.trial_id as u32).collect();
        columns.push(Column::new("trial".into(), ids));

        for name in &self.param_names {
            let values: Vec<Option<String>> = trials
                .iter()
                .map(|t| t.params.get(name).map(|v| v.to_string()))
                .collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        let scores: Vec<Option<f64>> = trials
            .iter()
            .map(|t| t.mean_score.is_finite().then_some(t.mean_score))
            .collect();
        let stds: Vec<Option<f64>> = trials
            .iter()
            .map(|t| t.score_std.is_finite().then_some(t.score_std))
            .collect();
        let durations: Vec<f64> = trials.iter().map(|t| t.duration_secs).collect();
        let statuses: Vec<String> = trials.iter().map(|t| t.status.to_string()).collect();

        columns.push(Column::new("mean_score".into(), scores));
        columns.push(Column::new("score_std".into(), stds));
        columns.push(Column::new("duration_secs".into(), durations));
        columns.push(Column::new("status".into(), statuses));

        Ok(DataFrame::new(columns)?)
    }

    /// Write `hpt_results.csv`
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe()?;
        write_csv(&mut df, path)
    }
}

/// Runs trials proposed by a [`GPSampler`] against a cross-validated objective
pub struct HyperparameterTuner {
    config: TuningConfig,
    space: SearchSpace,
    sampler: GPSampler,
}

impl HyperparameterTuner {
    pub fn new(config: TuningConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let space = config.search_space()?;
        let sampler = GPSampler::new(seed)
            .with_initial_points(config.initial_points())
            .with_candidates(config.n_candidates);
        Ok(Self {
            config,
            space,
            sampler,
        })
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    pub fn search_space(&self) -> &SearchSpace {
        &self.space
    }

    /// Run `num_trials` trials and return the study.
    ///
    /// A trial whose objective errors or yields a non-finite mean is recorded
    /// as failed and kept out of the Gaussian process. Fails when no trial
    /// completes.
    pub fn tune<F>(&mut self, mut objective: F) -> Result<Study>
    where
        F: FnMut(&Hyperparameters) -> Result<CVResults>,
    {
        let start = Instant::now();
        let mut study = Study::new(self.config.metric, self.space.param_names());
        let mut history: Vec<(Hyperparameters, f64)> = Vec::new();

        info!(
            trials = self.config.num_trials,
            folds = self.config.cv_folds,
            metric = %self.config.metric,
            parameters = self.space.len(),
            "Starting hyperparameter tuning"
        );

        for trial_idx in 0..self.config.num_trials {
            let trial_start = Instant::now();
            let params = self.sampler.suggest(&self.space, trial_idx, &history)?;

            let outcome = objective(&params).and_then(|cv| {
                if cv.mean_score.is_finite() {
                    Ok(cv)
                } else {
                    Err(ForestError::TuningError("objective returned no finite score".to_string()))
                }
            });

            let result = match outcome {
                Ok(cv) => {
                    history.push((params.clone(), cv.mean_score));
                    TrialResult {
                        trial_id: trial_idx + 1,
                        params,
                        mean_score: cv.mean_score,
                        score_std: cv.std_score,
                        fold_scores: cv.scores,
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        status: TrialStatus::Complete,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(trial = trial_idx + 1, error = %e, "Trial failed");
                    TrialResult {
                        trial_id: trial_idx + 1,
                        params,
                        mean_score: f64::NAN,
                        score_std: f64::NAN,
                        fold_scores: Vec::new(),
                        duration_secs: trial_start.elapsed().as_secs_f64(),
                        status: TrialStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };

            debug!(
                trial = result.trial_id,
                score = result.mean_score,
                std = result.score_std,
                status = %result.status,
                "Trial finished"
            );
            study.add_trial(result);
        }

        study.total_duration_secs = start.elapsed().as_secs_f64();

        match study.best_trial() {
            Some(best) => {
                info!(
                    best_trial = best.trial_id,
                    best_score = best.mean_score,
                    completed = study.n_complete(),
                    elapsed_s = study.total_duration_secs,
                    "Hyperparameter tuning finished"
                );
                Ok(study)
            }
            None => Err(ForestError::TuningError(format!(
                "all {} tuning trials failed",
                self.config.num_trials
            ))),
        }
    }
}
