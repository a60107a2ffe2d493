//! Binary classification decision tree

use crate::error::{ForestError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Nodes with fewer rows than this search splits sequentially
const PARALLEL_SPLIT_MIN_SAMPLES: usize = 2_048;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf holding the fraction of positive training rows that reached it
    Leaf {
        positive_fraction: f64,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    /// Impurity of a node holding `positives` out of `n` rows
    fn impurity(self, positives: usize, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let p = positives as f64 / n as f64;
        let q = 1.0 - p;
        match self {
            Criterion::Gini => 1.0 - p * p - q * q,
            Criterion::Entropy => {
                let term = |v: f64| if v > 0.0 { -v * v.log2() } else { 0.0 };
                term(p) + term(q)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }
}

/// Candidate split found for one feature
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree for 0/1 targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random for every split; `None` means all
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: u64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 0,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to `x` with 0/1 labels `y`
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ForestError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(ForestError::TrainingError(
                "cannot fit a tree on empty data".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&v| v > 1) {
            return Err(ForestError::TrainingError(format!(
                "labels must be 0 or 1, found {}",
                bad
            )));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();

        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] == 1).count();
        let leaf = TreeNode::Leaf {
            positive_fraction: positives as f64 / n_samples.max(1) as f64,
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || positives == 0
            || positives == n_samples;
        if should_stop {
            return leaf;
        }

        let parent_impurity = self.criterion.impurity(positives, n_samples);
        let features = self.draw_features(rng);

        let best = match self.find_best_split(x, y, indices, &features, parent_impurity) {
            Some(best) => best,
            None => return leaf,
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return leaf;
        }

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    /// Random feature subset for one split, in ascending index order
    fn draw_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features);
        if k == self.n_features {
            return (0..self.n_features).collect();
        }
        let mut features = sample(rng, self.n_features, k).into_vec();
        features.sort_unstable();
        features
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let search = |&feature_idx: &usize| {
            self.best_split_for_feature(x, y, indices, feature_idx, parent_impurity)
        };

        let candidates: Vec<Option<SplitCandidate>> = if indices.len() >= PARALLEL_SPLIT_MIN_SAMPLES {
            features.par_iter().map(search).collect()
        } else {
            features.iter().map(search).collect()
        };

        // first strictly better candidate wins, so ties go to the lowest feature index
        candidates.into_iter().flatten().fold(None, |best, c| match best {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
    }

    /// Sorted sweep over one feature, tracking positive counts on the left
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let total_pos: usize = pairs.iter().map(|p| p.1).sum();
        let mut left_pos = 0usize;
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n - 1 {
            left_pos += pairs[i].1;
            let left_n = i + 1;
            let right_n = n - left_n;

            if pairs[i].0 >= pairs[i + 1].0 {
                continue;
            }
            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }

            let weighted = (left_n as f64 * self.criterion.impurity(left_pos, left_n)
                + right_n as f64 * self.criterion.impurity(total_pos - left_pos, right_n))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: midpoint(pairs[i].0, pairs[i + 1].0),
                    gain,
                });
            }
        }
        best
    }

    /// Positive-class probability for every row
    pub fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ForestError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ForestError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| Self::leaf_value(root, row))
            .collect())
    }

    fn leaf_value(mut node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf {
                    positive_fraction, ..
                } => return *positive_fraction,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    /// Normalized impurity-decrease importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

/// Threshold between two sorted distinct values that keeps `low` on the left
/// and `high` on the right; the float midpoint of neighbours can round up to `high`
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = (low + high) / 2.0;
    if mid >= high || !mid.is_finite() {
        low
    } else {
        mid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data_fits_exactly() {
        let x = array![[0.0, 5.0], [1.0, 3.0], [2.0, 4.0], [3.0, 1.0], [4.0, 2.0]];
        let y = vec![0, 0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_positive(&x).unwrap();
        assert_eq!(proba.to_vec(), vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_neighbouring_floats_are_separated() {
        let a = 1.0000000000000002_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        let x = array![[a], [b]];
        let y = vec![0, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict_positive(&x).unwrap().to_vec(), vec![0.0, 1.0]);
        assert_eq!(tree.get_depth(), 1);

        assert_eq!(midpoint(a, b), a);
        assert_eq!(midpoint(1.0, 3.0), 2.0);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = vec![0, 1, 0, 1, 0, 1];

        let mut tree = DecisionTree::new().with_max_depth(Some(1));
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 1);

        // leaves hold class fractions, not hard votes
        let proba = tree.predict_positive(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = vec![0, 0, 0, 1];
        let mut tree = DecisionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        let proba = tree.predict_positive(&array![[4.0]]).unwrap();
        assert_eq!(proba[0], 0.5);
    }

    #[test]
    fn test_entropy_criterion() {
        assert!((Criterion::Entropy.impurity(5, 10) - 1.0).abs() < 1e-12);
        assert!((Criterion::Gini.impurity(5, 10) - 0.5).abs() < 1e-12);
        assert_eq!(Criterion::Gini.impurity(0, 10), 0.0);
    }

    #[test]
    fn test_feature_importances_favor_informative_feature() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = vec![0, 0, 1, 1];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_feature_subset_is_seeded() {
        let x = array![
            [0.0, 1.0, 0.3],
            [1.0, 0.0, 0.1],
            [0.5, 0.2, 0.9],
            [0.9, 0.8, 0.4],
            [0.2, 0.6, 0.7],
            [0.7, 0.3, 0.2]
        ];
        let y = vec![0, 1, 0, 1, 0, 1];

        let mut a = DecisionTree::new().with_max_features(Some(1)).with_random_state(9);
        let mut b = DecisionTree::new().with_max_features(Some(1)).with_random_state(9);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(
            a.predict_positive(&x).unwrap(),
            b.predict_positive(&x).unwrap()
        );
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict_positive(&array![[1.0]]),
            Err(ForestError::ModelNotFitted)
        ));

        let mut tree = DecisionTree::new();
        assert!(tree.fit(&array![[1.0], [2.0]], &[0]).is_err());
        assert!(tree.fit(&array![[1.0], [2.0]], &[0, 2]).is_err());
    }
}
