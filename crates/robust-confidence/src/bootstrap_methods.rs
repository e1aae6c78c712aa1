//! Bootstrap method implementations
//!
//! This module provides the methods that turn a bootstrap distribution into
//! a confidence interval, and the helper that applies a method to every
//! coefficient of a resampled coefficient matrix.

use crate::{ConfidenceInterval, ConfidenceLevel};
use robust_core::{utils, Error, Result};
use tracing::{debug, instrument};

/// Bootstrap method for calculating confidence intervals
///
/// This trait defines how to construct a confidence interval from
/// bootstrap estimates.
pub trait BootstrapMethod: Clone + Send + Sync {
    /// Calculate confidence interval from bootstrap distribution
    fn calculate_interval(
        &self,
        bootstrap_estimates: &[f64],
        original_estimate: f64,
        confidence_level: ConfidenceLevel,
    ) -> Result<ConfidenceInterval>;

    /// Method name for documentation
    fn name(&self) -> &'static str;
}

/// Percentile bootstrap method
///
/// Uses the empirical percentiles of the bootstrap distribution, linearly
/// interpolated between order statistics, as interval bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileBootstrap;

impl BootstrapMethod for PercentileBootstrap {
    fn calculate_interval(
        &self,
        bootstrap_estimates: &[f64],
        original_estimate: f64,
        confidence_level: ConfidenceLevel,
    ) -> Result<ConfidenceInterval> {
        if bootstrap_estimates.is_empty() {
            return Err(Error::InvalidInput("No bootstrap estimates".to_string()));
        }

        let sorted = utils::sorted(bootstrap_estimates);
        let (lower_q, upper_q) = confidence_level.percentile_bounds();

        Ok(ConfidenceInterval::new(
            utils::percentile_sorted(&sorted, lower_q),
            utils::percentile_sorted(&sorted, upper_q),
            original_estimate,
            confidence_level.value(),
        ))
    }

    fn name(&self) -> &'static str {
        "Percentile Bootstrap"
    }
}

/// Apply `method` to each coefficient of a set of resampled coefficient vectors
///
/// `draws` holds one coefficient vector per resample; `originals` the
/// full-sample estimates in the same order.
#[instrument(skip(method, draws, originals), fields(n_draws = draws.len(), n_coefs = originals.len()))]
pub fn coefficient_intervals<M: BootstrapMethod>(
    method: &M,
    draws: &[Vec<f64>],
    originals: &[f64],
    confidence_level: ConfidenceLevel,
) -> Result<Vec<ConfidenceInterval>> {
    let n_values = originals.len();
    let mut transposed = vec![Vec::with_capacity(draws.len()); n_values];

    for estimates in draws {
        if estimates.len() != n_values {
            return Err(Error::size_mismatch(
                n_values,
                estimates.len(),
                "bootstrap coefficient vector",
            ));
        }
        for (i, &value) in estimates.iter().enumerate() {
            transposed[i].push(value);
        }
    }

    debug!("{}: computing {} intervals", method.name(), n_values);

    transposed
        .iter()
        .zip(originals.iter())
        .map(|(values, &orig)| method.calculate_interval(values, orig, confidence_level))
        .collect()
}
