//! Command-line interface for training and batch prediction

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::error;

use crate::paths::{ConfigPaths, Paths, DEFAULT_CONFIG_DIR, DEFAULT_ROOT};
use crate::workflow::{run_batch_predictions, run_training, TrainingSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn fail(s: &str) -> ColoredString   { s.truecolor(230, 100, 100) }

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_failed(msg: &str) {
    println!("  {} {}", fail("✗"), msg);
}

fn kv(key: &str, val: &str) {
    println!("  {:<20} {}", muted(key), val.white());
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "binary-forest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and run a Random Forest binary classifier")]
#[command(long_about = None)]
pub struct Cli {
    /// Root directory holding inputs, model artifacts and outputs
    #[arg(long, global = true, default_value = DEFAULT_ROOT)]
    pub root: PathBuf,

    /// Directory holding the JSON configuration files
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on the training data and save its artifacts
    Train {
        /// Run Bayesian hyperparameter tuning before the final fit
        #[arg(long)]
        tune: bool,
    },

    /// Predict the test data with the saved artifacts
    Predict,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let paths = Paths::new(&self.root);
        let config_paths = ConfigPaths::new(&self.config_dir);
        match self.command {
            Commands::Train { tune } => cmd_train(&paths, &config_paths, tune),
            Commands::Predict => cmd_predict(&paths, &config_paths),
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Write the failure message to `outputs/errors/<command>_error.txt`
fn record_failure(paths: &Paths, command: &str, err: &crate::error::ForestError) {
    let path = paths.error_file(command);
    error!(command, error = %err, "Run failed");
    let written = std::fs::create_dir_all(&paths.errors_dir)
        .and_then(|_| std::fs::write(&path, format!("{}\n", err)));
    if let Err(io) = written {
        error!(path = %path.display(), error = %io, "Could not write error file");
    }
    step_failed(&err.to_string());
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

pub fn cmd_train(paths: &Paths, config_paths: &ConfigPaths, tune: bool) -> anyhow::Result<()> {
    section(if tune { "Train (with tuning)" } else { "Train" });
    step_run("Training");

    let start = Instant::now();
    let summary = match run_training(paths, config_paths, tune) {
        Ok(summary) => summary,
        Err(err) => {
            record_failure(paths, "train", &err);
            return Err(err.into());
        }
    };
    step_ok(&format!("done in {:.2?}", start.elapsed()));
    print_summary(&summary, paths);
    Ok(())
}

fn print_summary(summary: &TrainingSummary, paths: &Paths) {
    println!();
    kv("Training rows", &summary.n_train_rows.to_string());
    kv("Validation rows", &summary.n_validation_rows.to_string());
    kv("Features", &summary.feature_names.len().to_string());
    if let (Some(metric), Some(score)) = (&summary.tuning_metric, summary.tuning_best_score) {
        kv("Best CV score", &format!("{:.4} ({})", score, metric));
    }
    if let Some(metrics) = &summary.validation_metrics {
        kv("Val accuracy", &format!("{:.4}", metrics.accuracy));
        kv("Val F1", &format!("{:.4}", metrics.f1_score));
        kv("Val ROC-AUC", &format!("{:.4}", metrics.roc_auc));
    }
    kv("Artifacts", &display(&paths.artifacts_dir));
    println!();
}

pub fn cmd_predict(paths: &Paths, config_paths: &ConfigPaths) -> anyhow::Result<()> {
    section("Predict");
    step_run("Predicting");

    let start = Instant::now();
    let predictions = match run_batch_predictions(paths, config_paths) {
        Ok(df) => df,
        Err(err) => {
            record_failure(paths, "predict", &err);
            return Err(err.into());
        }
    };
    step_ok(&format!("done in {:.2?}", start.elapsed()));

    println!();
    kv("Rows", &predictions.height().to_string());
    kv("Output", &display(&paths.predictions_path));
    println!();
    Ok(())
}
