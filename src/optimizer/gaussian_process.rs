//! Gaussian Process for Bayesian Optimization
//!
//! GP regression with a Matern 5/2 kernel over normalized hyperparameter
//! coordinates, and an expected-improvement sampler that proposes the next
//! configuration to evaluate. Scores are maximized.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::search_space::SearchSpace;
use crate::error::{ForestError, Result};
use crate::training::Hyperparameters;

const MIN_VARIANCE: f64 = 1e-10;

/// Matern kernel with nu = 5/2
fn matern52(x1: &[f64], x2: &[f64], length_scale: f64) -> f64 {
    let dist = x1
        .iter()
        .zip(x2)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    let r = dist / length_scale;
    let sqrt5 = 5.0_f64.sqrt();
    (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
}

/// Gaussian Process model for regression
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    length_scale: f64,
    /// Noise variance added to the diagonal
    noise: f64,
    x_train: Vec<Vec<f64>>,
    /// Cholesky factor of K + noise*I
    l_chol: Option<Array2<f64>>,
    alpha: Option<Array1<f64>>,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    pub fn new(length_scale: f64) -> Self {
        Self {
            length_scale,
            noise: 1e-6,
            x_train: Vec::new(),
            l_chol: None,
            alpha: None,
            y_mean: 0.0,
            y_std: 1.0,
        }
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(MIN_VARIANCE);
        self
    }

    /// Fit on rows of normalized coordinates and their observed scores
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() || x.len() != y.len() {
            return Err(ForestError::TuningError(format!(
                "cannot fit a Gaussian process on {} points and {} scores",
                x.len(),
                y.len()
            )));
        }
        let n = y.len();

        let y = Array1::from_vec(y.to_vec());
        self.y_mean = y.mean().unwrap_or(0.0);
        self.y_std = y.std(0.0);
        if self.y_std < MIN_VARIANCE {
            self.y_std = 1.0;
        }
        let y_normalized = y.mapv(|yi| (yi - self.y_mean) / self.y_std);

        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                k[[i, j]] = matern52(&x[i], &x[j], self.length_scale);
            }
            k[[i, i]] += self.noise;
        }

        let l = cholesky(&k);
        let alpha = solve_cholesky(&l, &y_normalized);

        self.x_train = x.to_vec();
        self.l_chol = Some(l);
        self.alpha = Some(alpha);
        Ok(())
    }

    /// Posterior mean and variance at one point
    pub fn predict(&self, x: &[f64]) -> Result<(f64, f64)> {
        let (l, alpha) = match (&self.l_chol, &self.alpha) {
            (Some(l), Some(alpha)) => (l, alpha),
            _ => return Err(ForestError::ModelNotFitted),
        };

        let k_star: Array1<f64> = self
            .x_train
            .iter()
            .map(|xi| matern52(x, xi, self.length_scale))
            .collect();

        let mean = k_star.dot(alpha) * self.y_std + self.y_mean;

        let v = solve_lower_triangular(l, &k_star);
        let var = (1.0 - v.dot(&v)).max(MIN_VARIANCE) * self.y_std * self.y_std;

        Ok((mean, var))
    }
}

/// Cholesky decomposition with the diagonal floored for stability
fn cholesky(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                l[[j, j]] = (a[[j, j]] - sum).max(MIN_VARIANCE).sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    l
}

/// Solve L @ x = b for lower triangular L
fn solve_lower_triangular(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Solve L @ L^T @ x = b
fn solve_cholesky(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = solve_lower_triangular(l, b);

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }
    x
}

/// Expected improvement over `best` for a maximized objective
pub fn expected_improvement(mean: f64, var: f64, best: f64, xi: f64) -> f64 {
    let std = var.sqrt().max(MIN_VARIANCE);
    let improvement = mean - best - xi;
    let z = improvement / std;
    (improvement * normal_cdf(z) + std * normal_pdf(z)).max(0.0)
}

/// Gaussian Process based Bayesian Optimization sampler
#[derive(Debug)]
pub struct GPSampler {
    rng: Xoshiro256PlusPlus,
    gp: GaussianProcess,
    /// Random proposals before the GP is used
    n_initial_points: usize,
    /// Random candidates scored per proposal
    n_candidates: usize,
    /// Exploration margin for expected improvement
    xi: f64,
}

impl GPSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            gp: GaussianProcess::new(0.5),
            n_initial_points: 5,
            n_candidates: 500,
            xi: 0.01,
        }
    }

    pub fn with_initial_points(mut self, n: usize) -> Self {
        self.n_initial_points = n.max(1);
        self
    }

    pub fn with_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    pub fn with_length_scale(mut self, length_scale: f64) -> Self {
        self.gp = GaussianProcess::new(length_scale);
        self
    }

    /// Propose the next configuration.
    ///
    /// `trial_idx` counts every trial so far, failed ones included; `history`
    /// holds only successful trials. Proposals are always drawn from the space.
    pub fn suggest(
        &mut self,
        space: &SearchSpace,
        trial_idx: usize,
        history: &[(Hyperparameters, f64)],
    ) -> Result<Hyperparameters> {
        if trial_idx < self.n_initial_points || history.is_empty() || space.is_empty() {
            return Ok(space.sample(&mut self.rng));
        }

        let mut x = Vec::with_capacity(history.len());
        let mut y = Vec::with_capacity(history.len());
        for (params, score) in history {
            x.push(space.to_unit(params)?);
            y.push(*score);
        }
        self.gp.fit(&x, &y)?;
        let best = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut best_params = space.sample(&mut self.rng);
        let mut best_acq = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let candidate = space.sample(&mut self.rng);
            let (mean, var) = self.gp.predict(&space.to_unit(&candidate)?)?;
            let acq = expected_improvement(mean, var, best, self.xi);
            if acq > best_acq {
                best_acq = acq;
                best_params = candidate;
            }
        }
        Ok(best_params)
    }
}

/// Standard normal CDF approximation
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal PDF
fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Error function approximation (Abramowitz and Stegun 7.1.26)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::HyperparameterValue;

    #[test]
    fn test_matern_same_point() {
        assert!((matern52(&[0.3, 0.2], &[0.3, 0.2], 1.0) - 1.0).abs() < 1e-12);
        assert!(matern52(&[0.0], &[1.0], 0.5) < 1.0);
    }

    #[test]
    fn test_gp_interpolates_training_points() {
        let x: Vec<Vec<f64>> = vec![vec![0.0], vec![0.25], vec![0.5], vec![0.75], vec![1.0]];
        let y: Vec<f64> = x.iter().map(|p| (p[0] - 0.5).powi(2)).collect();

        let mut gp = GaussianProcess::new(0.5);
        gp.fit(&x, &y).unwrap();

        for (xi, yi) in x.iter().zip(&y) {
            let (mean, var) = gp.predict(xi).unwrap();
            assert!((mean - yi).abs() < 1e-3);
            assert!(var >= 0.0);
        }
        let (_, far_var) = gp.predict(&[3.0]).unwrap();
        let (_, near_var) = gp.predict(&[0.5]).unwrap();
        assert!(far_var > near_var);
    }

    #[test]
    fn test_gp_predict_unfitted() {
        let gp = GaussianProcess::new(1.0);
        assert!(gp.predict(&[0.0]).is_err());
    }

    #[test]
    fn test_expected_improvement() {
        assert!(expected_improvement(0.9, 0.01, 0.5, 0.0) > expected_improvement(0.4, 0.01, 0.5, 0.0));
        assert!(expected_improvement(0.0, 1e-12, 1.0, 0.0) >= 0.0);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!(normal_cdf(-3.0) < 0.01);
        assert!(normal_cdf(3.0) > 0.99);
    }

    #[test]
    fn test_sampler_moves_towards_good_region() {
        let space = SearchSpace::new().real("x", 0.0, 1.0);
        let mut sampler = GPSampler::new(42).with_initial_points(3).with_candidates(200);

        let history: Vec<(Hyperparameters, f64)> = (0..6)
            .map(|i| {
                let x = i as f64 / 5.0;
                let params = Hyperparameters::new().with("x", HyperparameterValue::Real(x));
                (params, -(x - 0.8).powi(2))
            })
            .collect();

        let proposal = sampler.suggest(&space, 6, &history).unwrap();
        assert!(space.contains(&proposal));
        let x = proposal.get("x").and_then(|v| v.as_f64()).unwrap();
        assert!(x > 0.4, "proposal {} should lean towards the optimum", x);
    }

    #[test]
    fn test_sampler_is_seeded() {
        let space = SearchSpace::new().int("n", 1, 100);
        let a = GPSampler::new(5).suggest(&space, 0, &[]).unwrap();
        let b = GPSampler::new(5).suggest(&space, 0, &[]).unwrap();
        assert_eq!(a, b);
    }
}
