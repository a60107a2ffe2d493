//! SMOTE oversampling for binary targets

use crate::error::{ForestError, Result};
use ndarray::{Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Synthetic Minority Over-sampling Technique.
///
/// Brings the minority class up to the majority count by interpolating
/// between each chosen minority row and one of its k nearest minority
/// neighbours. Only ever applied to training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

impl Smote {
    pub fn new(k_neighbors: usize, seed: u64) -> Self {
        Self {
            k_neighbors: k_neighbors.max(1),
            seed,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
    }

    /// Indices (into `rows`) of the k nearest rows to `rows[target]`, excluding itself
    fn nearest(rows: &[Vec<f64>], target: usize, k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
        for (i, row) in rows.iter().enumerate() {
            if i == target {
                continue;
            }
            let d = DistIdx(Self::squared_distance(&rows[target], row), i);
            if heap.len() < k {
                heap.push(d);
            } else if heap.peek().map_or(false, |top| d < *top) {
                heap.pop();
                heap.push(d);
            }
        }
        let mut neighbours = heap.into_sorted_vec();
        neighbours.truncate(k);
        neighbours.into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Return the original rows followed by synthetic minority rows
    pub fn fit_resample(&self, x: &Array2<f64>, y: &[usize]) -> Result<(Array2<f64>, Vec<usize>)> {
        if x.nrows() != y.len() {
            return Err(ForestError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let positives = y.iter().filter(|&&c| c == 1).count();
        let negatives = y.len() - positives;
        if positives == 0 || negatives == 0 {
            return Err(ForestError::ValidationError(
                "SMOTE needs both classes in the training data".to_string(),
            ));
        }

        let (minority_class, n_minority, n_majority) = if positives < negatives {
            (1, positives, negatives)
        } else {
            (0, negatives, positives)
        };
        let n_to_generate = n_majority - n_minority;
        if n_to_generate == 0 {
            return Ok((x.clone(), y.to_vec()));
        }

        let minority: Vec<Vec<f64>> = y
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == minority_class)
            .map(|(i, _)| x.row(i).to_vec())
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut synthetic: Vec<f64> = Vec::with_capacity(n_to_generate * x.ncols());

        if minority.len() == 1 {
            warn!("Only one minority row; SMOTE falls back to duplicating it");
            for _ in 0..n_to_generate {
                synthetic.extend_from_slice(&minority[0]);
            }
        } else {
            let k = self.k_neighbors.min(minority.len() - 1);
            let neighbours: Vec<Vec<usize>> = (0..minority.len())
                .map(|i| Self::nearest(&minority, i, k))
                .collect();

            for _ in 0..n_to_generate {
                let base = rng.gen_range(0..minority.len());
                let neighbour = neighbours[base][rng.gen_range(0..neighbours[base].len())];
                let gap: f64 = rng.gen();
                synthetic.extend(
                    minority[base]
                        .iter()
                        .zip(&minority[neighbour])
                        .map(|(&p, &n)| p + gap * (n - p)),
                );
            }
        }

        let synthetic = Array2::from_shape_vec((n_to_generate, x.ncols()), synthetic)?;
        let x_out = ndarray::concatenate(Axis(0), &[x.view(), synthetic.view()])?;
        let mut y_out = y.to_vec();
        y_out.extend(std::iter::repeat(minority_class).take(n_to_generate));

        debug!(
            minority_class,
            generated = n_to_generate,
            rows = x_out.nrows(),
            "SMOTE resampled training data"
        );
        Ok((x_out, y_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_balances_classes() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [0.3, 0.3],
            [0.4, 0.2],
            [5.0, 5.0],
            [5.2, 5.1],
        ];
        let y = vec![0, 0, 0, 0, 0, 1, 1];

        let (x_res, y_res) = Smote::new(5, 42).fit_resample(&x, &y).unwrap();
        assert_eq!(x_res.nrows(), 10);
        assert_eq!(y_res.iter().filter(|&&c| c == 1).count(), 5);

        // synthetic rows lie on the segment between the two minority rows
        for row in x_res.rows().into_iter().skip(7) {
            assert!(row[0] >= 5.0 && row[0] <= 5.2);
            assert!(row[1] >= 5.0 && row[1] <= 5.1);
        }
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = vec![0, 0, 0, 0, 1, 1, 1];
        let a = Smote::new(2, 7).fit_resample(&x, &y).unwrap();
        let b = Smote::new(2, 7).fit_resample(&x, &y).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn test_single_minority_row_is_duplicated() {
        let x = array![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [9.0, 9.0]];
        let y = vec![0, 0, 0, 1];
        let (x_res, y_res) = Smote::new(5, 1).fit_resample(&x, &y).unwrap();
        assert_eq!(y_res.len(), 6);
        assert_eq!(x_res.row(5).to_vec(), vec![9.0, 9.0]);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        assert!(Smote::new(5, 1).fit_resample(&x, &[1, 1]).is_err());
    }

    #[test]
    fn test_balanced_input_unchanged() {
        let x = array![[0.0], [1.0]];
        let (x_res, y_res) = Smote::new(5, 1).fit_resample(&x, &[0, 1]).unwrap();
        assert_eq!(x_res, x);
        assert_eq!(y_res, vec![0, 1]);
    }
}
