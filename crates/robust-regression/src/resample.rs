//! Resampling: case bootstrap, response permutation and sign flipping
//!
//! Every task gets its own seed drawn from one master generator, so results
//! do not depend on how tasks are spread over threads.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use robust_core::{utils, Error, ExecutionEngine, Result};
use tracing::{debug, instrument};

use crate::covariance::{ols, CovarianceContext};
use crate::design::{group_rows, RegressionData};
use crate::estimator::least_squares;
use crate::options::{CovarianceType, PermutationScheme, PermutationStatistic};
use crate::stats::one_sample_t;

/// Coefficient vectors of the bootstrap resamples that could be fitted
#[derive(Debug, Clone)]
pub struct BootstrapDraws {
    pub draws: Vec<Vec<f64>>,
    /// Resamples whose fit failed (e.g. a singular resampled design)
    pub failed: usize,
}

/// Refit on `n_boot` row resamples drawn with replacement
///
/// Weights and clusters travel with their rows; group-variance weights are
/// recomputed on each resample.
#[instrument(skip(engine, data), fields(n_obs = data.design.n_obs()))]
pub fn bootstrap_coefficients<E: ExecutionEngine>(
    engine: &E,
    data: &RegressionData,
    n_boot: usize,
    seed: Option<u64>,
) -> BootstrapDraws {
    let n = data.design.n_obs();
    let seeds = utils::derive_seeds(seed, n_boot);
    debug!("Running {} bootstrap refits", n_boot);

    let results: Vec<Option<Vec<f64>>> = engine.execute_batch(n_boot, |i| {
        let mut rng = StdRng::seed_from_u64(seeds[i]);
        let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let resampled = data.select_rows(&rows);
        refit_coefficients(&resampled).ok()
    });

    let failed = results.iter().filter(|r| r.is_none()).count();
    BootstrapDraws {
        draws: results.into_iter().flatten().collect(),
        failed,
    }
}

fn refit_coefficients(data: &RegressionData) -> Result<Vec<f64>> {
    let y = data.design.y();
    let weights = match &data.weights {
        Some(w) => Some(w.resolve(y.as_slice())?),
        None => None,
    };
    let fit = least_squares(data.design.x(), y, weights.as_deref())?;
    Ok(fit.coefficients.iter().copied().collect())
}

/// Settings shared by every permutation refit
#[derive(Debug, Clone, Copy)]
pub struct PermutationPlan<'a> {
    pub covariance: CovarianceType,
    pub n_lags: usize,
    pub scheme: PermutationScheme,
    /// Resolved per-row weights, fixed to their rows
    pub weights: Option<&'a [f64]>,
}

/// t statistics of every coefficient under `n_perm` shuffles of the response
///
/// Returns one t vector per permutation.
#[instrument(skip(engine, data, plan), fields(n_obs = data.design.n_obs()))]
pub fn permutation_t_stats<E: ExecutionEngine>(
    engine: &E,
    data: &RegressionData,
    plan: &PermutationPlan<'_>,
    n_perm: usize,
    seed: Option<u64>,
) -> Result<Vec<Vec<f64>>> {
    let x = data.design.x();
    let y = data.design.y();
    let clusters = data.clusters.as_deref();
    let blocks = match (plan.scheme, clusters) {
        (PermutationScheme::WithinClusters, Some(c)) => group_rows(c),
        (PermutationScheme::WithinClusters, None) => {
            return Err(Error::InvalidParameter(
                "within-cluster permutation requires a cluster assignment".to_string(),
            ))
        }
        (PermutationScheme::Global, _) => vec![(0..y.len()).collect()],
    };
    let ctx = CovarianceContext::new(plan.n_lags, clusters);
    let seeds = utils::derive_seeds(seed, n_perm);
    debug!("Running {} permutation refits over {} blocks", n_perm, blocks.len());

    engine
        .execute_batch(n_perm, |i| {
            let mut rng = StdRng::seed_from_u64(seeds[i]);
            let shuffled = shuffle_within(y, &blocks, &mut rng);
            ols(x, &shuffled, plan.weights, plan.covariance, &ctx).map(|fit| fit.t_stats)
        })
        .into_iter()
        .collect()
}

/// Permute response entries inside each block of row indices
fn shuffle_within(y: &DVector<f64>, blocks: &[Vec<usize>], rng: &mut StdRng) -> DVector<f64> {
    let mut out = y.clone();
    for rows in blocks {
        let mut order = rows.clone();
        order.shuffle(rng);
        for (&dst, &src) in rows.iter().zip(&order) {
            out[dst] = y[src];
        }
    }
    out
}

/// Null distribution of a one-sample statistic under random sign flips
#[instrument(skip(engine, values), fields(n = values.len()))]
pub fn sign_flip_statistics<E: ExecutionEngine>(
    engine: &E,
    values: &[f64],
    statistic: PermutationStatistic,
    n_perm: usize,
    seed: Option<u64>,
) -> Vec<f64> {
    let seeds = utils::derive_seeds(seed, n_perm);
    engine.execute_batch(n_perm, |i| {
        let mut rng = StdRng::seed_from_u64(seeds[i]);
        let flipped: Vec<f64> = values
            .iter()
            .map(|&v| if rng.gen::<bool>() { v } else { -v })
            .collect();
        one_sample_statistic(&flipped, statistic)
    })
}

/// The observed value of a sign-flip statistic
pub fn one_sample_statistic(values: &[f64], statistic: PermutationStatistic) -> f64 {
    match statistic {
        PermutationStatistic::Mean => utils::mean(values),
        PermutationStatistic::TStat => one_sample_t(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignMatrix;
    use robust_core::SequentialEngine;

    fn data() -> RegressionData {
        let x: Vec<f64> = (0..30).map(|i| i as f64 / 3.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.0 + 0.5 * v + if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect();
        RegressionData::new(DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap())
    }

    #[test]
    fn test_bootstrap_is_reproducible() {
        let engine = SequentialEngine::new();
        let a = bootstrap_coefficients(&engine, &data(), 20, Some(7));
        let b = bootstrap_coefficients(&engine, &data(), 20, Some(7));
        assert_eq!(a.draws, b.draws);
        assert_eq!(a.failed, 0);
        assert_eq!(a.draws.len(), 20);
    }

    #[test]
    fn test_bootstrap_counts_failed_resamples() {
        // resamples that miss the only non-zero row are rank deficient
        let mut x = vec![0.0; 10];
        x[0] = 1.0;
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let d = RegressionData::new(DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap());
        let out = bootstrap_coefficients(&SequentialEngine::new(), &d, 50, Some(3));
        assert!(out.failed > 0);
        assert_eq!(out.draws.len() + out.failed, 50);
    }

    #[test]
    fn test_within_cluster_shuffle_keeps_blocks() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        let blocks = vec![vec![0, 1, 2], vec![3, 4, 5]];
        let mut rng = StdRng::seed_from_u64(11);
        let out = shuffle_within(&y, &blocks, &mut rng);
        let mut first: Vec<f64> = out.rows(0, 3).iter().copied().collect();
        first.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(first, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_within_clusters_requires_clusters() {
        let d = data();
        let plan = PermutationPlan {
            covariance: CovarianceType::Classical,
            n_lags: 1,
            scheme: PermutationScheme::WithinClusters,
            weights: None,
        };
        assert!(permutation_t_stats(&SequentialEngine::new(), &d, &plan, 5, Some(1)).is_err());
    }

    #[test]
    fn test_permutation_shapes() {
        let d = data();
        let plan = PermutationPlan {
            covariance: CovarianceType::Hc1,
            n_lags: 1,
            scheme: PermutationScheme::Global,
            weights: None,
        };
        let t = permutation_t_stats(&SequentialEngine::new(), &d, &plan, 25, Some(5)).unwrap();
        assert_eq!(t.len(), 25);
        assert!(t.iter().all(|v| v.len() == 2));
    }

    #[test]
    fn test_sign_flip_mean_is_symmetric() {
        let values = vec![1.0; 40];
        let null = sign_flip_statistics(
            &SequentialEngine::new(),
            &values,
            PermutationStatistic::Mean,
            400,
            Some(9),
        );
        let mean = utils::mean(&null);
        assert!(mean.abs() < 0.05);
        assert!(null.iter().all(|v| v.abs() <= 1.0));
    }
}
