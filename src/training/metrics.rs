//! Binary classification metrics

use crate::error::{ForestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Probabilities are clipped to `[EPS, 1 - EPS]` for log loss
const EPS: f64 = 1e-15;

/// Metric optimized during tuning; higher is always better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    #[serde(alias = "f1")]
    F1Score,
    #[serde(alias = "auc", alias = "auc_roc")]
    RocAuc,
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Accuracy
    }
}

impl Metric {
    /// Score positive-class probabilities against 0/1 labels
    pub fn score(&self, y_true: &[usize], positive_proba: &[f64]) -> f64 {
        let y_pred = threshold(positive_proba);
        match self {
            Metric::Accuracy => accuracy(y_true, &y_pred),
            Metric::Precision => precision(y_true, &y_pred),
            Metric::Recall => recall(y_true, &y_pred),
            Metric::F1Score => f1_score(y_true, &y_pred),
            Metric::RocAuc => roc_auc(y_true, positive_proba),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::Recall => "recall",
            Metric::F1Score => "f1_score",
            Metric::RocAuc => "roc_auc",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| ForestError::ConfigError(format!("unknown metric '{}'", s)))
    }
}

/// Hard labels at the 0.5 threshold; ties go to class 0
pub fn threshold(positive_proba: &[f64]) -> Vec<usize> {
    positive_proba.iter().map(|&p| usize::from(p > 0.5)).collect()
}

fn confusion_counts(y_true: &[usize], y_pred: &[usize]) -> (usize, usize, usize, usize) {
    let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == 1, p == 1) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }
    (tp, fp, tn, fn_)
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

pub fn precision(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let (tp, fp, _, _) = confusion_counts(y_true, y_pred);
    if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    }
}

pub fn recall(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let (tp, _, _, fn_) = confusion_counts(y_true, y_pred);
    if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    }
}

pub fn f1_score(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let p = precision(y_true, y_pred);
    let r = recall(y_true, y_pred);
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

/// Area under the ROC curve from the Mann-Whitney rank statistic, with tied
/// scores given their average rank. Undefined (single class) returns 0.5.
pub fn roc_auc(y_true: &[usize], scores: &[f64]) -> f64 {
    let n = y_true.len().min(scores.len());
    let n_pos = y_true[..n].iter().filter(|&&y| y == 1).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&k| y_true[k] == 1).map(|k| ranks[k]).sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos * n_neg) as f64
}

pub fn log_loss(y_true: &[usize], positive_proba: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(positive_proba)
        .map(|(&y, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            if y == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / y_true.len() as f64
}

/// Evaluation summary for a fitted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: f64,
    pub log_loss: f64,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &[usize], positive_proba: &[f64]) -> Self {
        let y_pred = threshold(positive_proba);
        Self {
            accuracy: accuracy(y_true, &y_pred),
            precision: precision(y_true, &y_pred),
            recall: recall(y_true, &y_pred),
            f1_score: f1_score(y_true, &y_pred),
            roc_auc: roc_auc(y_true, positive_proba),
            log_loss: log_loss(y_true, positive_proba),
            n_samples: y_true.len(),
        }
    }
}
