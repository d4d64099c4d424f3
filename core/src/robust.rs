//! Robust Estimation Module
//!
//! Provides a generic RANSAC implementation that can be used for any model estimation task.

use rand::rngs::StdRng;
use rand::seq::index::sample as sample_indices;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Configuration for robust estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    /// Maximum residual (pixels) for a datum to count as an inlier.
    pub threshold: f64,
    pub max_iterations: usize,
    /// Probability of having drawn at least one outlier-free sample before
    /// the adaptive iteration bound stops the search.
    pub confidence: f64,
    /// Smallest consensus set accepted as a valid fit.
    pub min_inliers: usize,
    /// Seed for sample selection; fixed so repeated runs agree.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            max_iterations: 2000,
            confidence: 0.99,
            min_inliers: 4,
            seed: 0,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.threshold > 0.0) {
            return Err(crate::Error::InvalidConfig(format!(
                "ransac: threshold must be positive, got {}",
                self.threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(crate::Error::InvalidConfig(
                "ransac: max_iterations must be >= 1".into(),
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(crate::Error::InvalidConfig(format!(
                "ransac: confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Result of robust estimation
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    /// Mean inlier residual of the returned model.
    pub residual: f64,
    pub iterations: usize,
}

impl<M> RobustResult<M> {
    fn failed(n: usize, iterations: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
            iterations,
        }
    }

    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter_map(|(i, &is_inlier)| is_inlier.then_some(i))
            .collect()
    }
}

/// Trait for models that can be estimated robustly
pub trait RobustModel<D> {
    type Model: Clone;

    /// Minimum number of data points required to estimate the model
    fn min_sample_size(&self) -> usize;

    /// Estimate model from a sample (minimal or larger)
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    /// Compute error for a single data point against the model
    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;

    /// Samples that cannot produce a meaningful hypothesis are skipped.
    fn is_degenerate(&self, _sample: &[&D]) -> bool {
        false
    }
}

/// Generic RANSAC engine
pub struct Ransac<D, M: RobustModel<D>> {
    config: RansacConfig,
    _phantom: PhantomData<(D, M)>,
}

impl<D, M: RobustModel<D>> Ransac<D, M> {
    pub fn new(config: RansacConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    pub fn config(&self) -> &RansacConfig {
        &self.config
    }

    pub fn run(&self, estimator: &M, data: &[D]) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();

        if n < k || k == 0 {
            return RobustResult::failed(n, 0);
        }

        let mut best: Option<(M::Model, Vec<bool>, usize, f64)> = None;
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut max_iterations = self.config.max_iterations;
        let mut iterations = 0;

        while iterations < max_iterations {
            iterations += 1;

            // 1. Sample
            let sample: Vec<&D> = sample_indices(&mut rng, n, k)
                .iter()
                .map(|i| &data[i])
                .collect();
            if estimator.is_degenerate(&sample) {
                continue;
            }

            // 2. Estimate
            let Some(model) = estimator.estimate(&sample) else {
                continue;
            };

            // 3. Score
            let (inliers, num_inliers, residual) = self.score(estimator, &model, data);
            let improves = match &best {
                None => num_inliers > 0,
                Some((_, _, best_n, best_res)) => {
                    num_inliers > *best_n || (num_inliers == *best_n && residual < *best_res)
                }
            };

            if improves {
                max_iterations = max_iterations.min(adaptive_iterations(
                    self.config.confidence,
                    num_inliers as f64 / n as f64,
                    k,
                ));
                best = Some((model, inliers, num_inliers, residual));
            }
        }

        let Some((model, inliers, num_inliers, residual)) = best else {
            return RobustResult::failed(n, iterations);
        };

        if num_inliers < self.config.min_inliers.max(k) {
            return RobustResult {
                model: None,
                inliers,
                num_inliers,
                residual,
                iterations,
            };
        }

        // 4. Refit on the consensus set; keep the sample model if the refit
        // loses support.
        let consensus: Vec<&D> = data
            .iter()
            .zip(inliers.iter())
            .filter_map(|(d, &is_inlier)| is_inlier.then_some(d))
            .collect();
        if let Some(refit) = estimator.estimate(&consensus) {
            let (refit_inliers, refit_n, refit_res) = self.score(estimator, &refit, data);
            if refit_n >= num_inliers {
                return RobustResult {
                    model: Some(refit),
                    inliers: refit_inliers,
                    num_inliers: refit_n,
                    residual: refit_res,
                    iterations,
                };
            }
        }

        RobustResult {
            model: Some(model),
            inliers,
            num_inliers,
            residual,
            iterations,
        }
    }

    fn score(&self, estimator: &M, model: &M::Model, data: &[D]) -> (Vec<bool>, usize, f64) {
        let mut inliers = vec![false; data.len()];
        let mut num_inliers = 0;
        let mut total_error = 0.0;

        for (j, d) in data.iter().enumerate() {
            let err = estimator.compute_error(model, d);
            if err < self.config.threshold {
                inliers[j] = true;
                num_inliers += 1;
                total_error += err;
            }
        }

        let residual = if num_inliers > 0 {
            total_error / num_inliers as f64
        } else {
            f64::INFINITY
        };
        (inliers, num_inliers, residual)
    }
}

/// Iterations needed to draw one all-inlier sample of size `k` with
/// probability `confidence` given the observed inlier ratio.
fn adaptive_iterations(confidence: f64, inlier_ratio: f64, k: usize) -> usize {
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let p_good = inlier_ratio.powi(k as i32);
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    let confidence = confidence.clamp(0.0, 1.0 - 1e-12);
    let needed = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if needed.is_finite() && needed >= 0.0 {
        needed.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}
