//! Single-model fitting: point estimates, covariance, degrees of freedom,
//! intervals and p-values assembled into one [`LinearFit`]

use robust_confidence::{
    coefficient_intervals, two_sided_p_value, ConfidenceInterval, PercentileBootstrap,
    StudentsTInterval,
};
use robust_core::{utils, Engine, Error, HierarchicalExecution, Result};
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::covariance::{covariance_matrix, standard_errors, CovarianceContext};
use crate::design::RegressionData;
use crate::estimator::least_squares;
use crate::inference::permutation_p_value;
use crate::options::{ConfInt, CovarianceType, FitOptions};
use crate::resample::{bootstrap_coefficients, permutation_t_stats, PermutationPlan};
use crate::stats::FitStatistics;
use crate::table::{CoefficientTable, Inference};
use crate::weights::{group_count, welch_satterthwaite, Weights};

/// Permutation counts below this produce a [`FitWarning::LowPermutationCount`]
pub const MIN_RECOMMENDED_PERMUTATIONS: usize = 500;

/// Non-fatal conditions encountered while fitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FitWarning {
    /// Too few permutations for stable p-values
    LowPermutationCount { n_perm: usize },
    /// Welch correction requested without exactly two weight groups
    WelchGroupCount { groups: usize },
    /// Some bootstrap resamples could not be fitted and were skipped
    FailedResamples { failed: usize, requested: usize },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::LowPermutationCount { n_perm } => write!(
                f,
                "{n_perm} permutations requested; at least {MIN_RECOMMENDED_PERMUTATIONS} \
                 are recommended for stable p-values"
            ),
            FitWarning::WelchGroupCount { groups } => write!(
                f,
                "Welch-Satterthwaite correction needs exactly 2 weight groups, found {groups}; \
                 using n - p degrees of freedom"
            ),
            FitWarning::FailedResamples { failed, requested } => write!(
                f,
                "{failed} of {requested} bootstrap resamples could not be fitted and were skipped"
            ),
        }
    }
}

/// Log and keep a warning
pub(crate) fn record(warnings: &mut Vec<FitWarning>, warning: FitWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

/// Ordinary or weighted least squares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Estimator {
    Ols,
    Wls,
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimator::Ols => f.write_str("OLS"),
            Estimator::Wls => f.write_str("WLS"),
        }
    }
}

/// A fitted linear model
#[derive(Debug, Clone, Serialize)]
pub struct LinearFit {
    pub table: CoefficientTable,
    pub coefficients: Vec<f64>,
    /// `X b`
    pub fitted: Vec<f64>,
    /// `y - X b`
    pub residuals: Vec<f64>,
    pub statistics: FitStatistics,
    pub estimator: Estimator,
    pub covariance: CovarianceType,
    pub conf_int: ConfInt,
    pub n_boot: usize,
    pub confidence_level: f64,
    /// Degrees of freedom used for t-based inference
    pub df: f64,
    pub n_obs: usize,
    pub warnings: Vec<FitWarning>,
}

impl LinearFit {
    /// Standard error description, `non-robust` or e.g. `robust (hc1)`
    pub fn se_type(&self) -> String {
        describe_se(self.covariance)
    }

    /// Interval description, `standard` or e.g. `boot (500)`
    pub fn ci_type(&self) -> String {
        describe_ci(self.conf_int, self.n_boot)
    }

    /// How significance was assessed
    pub fn sig_type(&self) -> String {
        describe_sig(self.table.inference())
    }
}

pub(crate) fn describe_se(covariance: CovarianceType) -> String {
    if covariance.is_robust() {
        format!("robust ({covariance})")
    } else {
        "non-robust".to_string()
    }
}

pub(crate) fn describe_ci(conf_int: ConfInt, n_boot: usize) -> String {
    match conf_int {
        ConfInt::Standard => "standard".to_string(),
        ConfInt::Boot => format!("boot ({n_boot})"),
    }
}

pub(crate) fn describe_sig(inference: &Inference) -> String {
    match inference {
        Inference::Parametric { .. } => "parametric".to_string(),
        Inference::Permutation { n_perm, .. } => format!("permutation ({n_perm})"),
        Inference::Bootstrapped { .. } => "bootstrapped".to_string(),
    }
}

/// Fit `data` with a fresh engine sized by `options.n_jobs`
pub fn fit_linear(data: &RegressionData, options: &FitOptions) -> Result<LinearFit> {
    let engine = Engine::from_jobs(options.n_jobs)?;
    fit_linear_with_engine(data, options, &engine)
}

/// Fit `data`, dispatching resampling work on `engine`
#[instrument(
    skip(data, options, engine),
    fields(
        n_obs = data.design.n_obs(),
        n_coefs = data.design.n_coefs(),
        covariance = %options.covariance,
    )
)]
pub fn fit_linear_with_engine(
    data: &RegressionData,
    options: &FitOptions,
    engine: &Engine,
) -> Result<LinearFit> {
    options.validate()?;
    let design = &data.design;
    let (n, p) = (design.n_obs(), design.n_coefs());
    if n <= p {
        return Err(Error::InsufficientData {
            expected: p + 1,
            actual: n,
        });
    }

    let mut warnings = Vec::new();
    if let Some(n_perm) = options.permute {
        if n_perm < MIN_RECOMMENDED_PERMUTATIONS {
            record(&mut warnings, FitWarning::LowPermutationCount { n_perm });
        }
    }

    let covariance = options.covariance;
    if covariance == CovarianceType::Cluster && data.clusters.is_none() {
        return Err(Error::InvalidParameter(
            "cluster covariance requires a cluster assignment".to_string(),
        ));
    }

    let weights = data
        .weights
        .as_ref()
        .map(|w| w.resolve(design.y().as_slice()))
        .transpose()?;
    let base = least_squares(design.x(), design.y(), weights.as_deref())?;
    let ctx = CovarianceContext::new(options.n_lags, data.clusters.as_deref());
    let vcv = covariance_matrix(&base, covariance, &ctx)?;

    let coefficients: Vec<f64> = base.coefficients.iter().copied().collect();
    let std_errors: Vec<f64> = standard_errors(&vcv).iter().copied().collect();
    let t_stats: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(b, s)| b / s)
        .collect();

    let df = inference_df(data, options, &mut warnings)?;
    debug!("Using {} degrees of freedom", df);

    let streams = utils::derive_seeds(options.seed, 2);
    let intervals = match options.conf_int {
        ConfInt::Standard => {
            let t_interval = StudentsTInterval::new(options.confidence_level);
            coefficients
                .iter()
                .zip(&std_errors)
                .map(|(&b, &s)| t_interval.interval(b, s, df))
                .collect::<Result<Vec<ConfidenceInterval>>>()?
        }
        ConfInt::Boot => {
            let boot = bootstrap_coefficients(engine, data, options.n_boot, Some(streams[0]));
            if boot.failed > 0 {
                record(
                    &mut warnings,
                    FitWarning::FailedResamples {
                        failed: boot.failed,
                        requested: options.n_boot,
                    },
                );
            }
            if boot.draws.is_empty() {
                return Err(Error::Computation(
                    "every bootstrap resample failed to fit".to_string(),
                ));
            }
            coefficient_intervals(
                &PercentileBootstrap,
                &boot.draws,
                &coefficients,
                options.confidence_level,
            )?
        }
    };

    let inference = match options.permute {
        Some(n_perm) => {
            let plan = PermutationPlan {
                covariance,
                n_lags: options.n_lags,
                scheme: options.permutation_scheme,
                weights: weights.as_deref(),
            };
            // robust permutation refits always run on the calling thread
            let null = if covariance.is_robust() {
                debug!("Robust covariance with permutation: running refits sequentially");
                let sequential = engine.subordinate();
                permutation_t_stats(&sequential, data, &plan, n_perm, Some(streams[1]))?
            } else {
                permutation_t_stats(engine, data, &plan, n_perm, Some(streams[1]))?
            };
            let p_values = (0..p)
                .map(|j| {
                    let column: Vec<f64> = null.iter().map(|t| t[j]).collect();
                    permutation_p_value(&column, t_stats[j])
                })
                .collect();
            Inference::Permutation { n_perm, p_values }
        }
        None if options.conf_int == ConfInt::Boot => Inference::Bootstrapped {
            n_boot: options.n_boot,
        },
        None => Inference::Parametric {
            df: vec![df; p],
            p_values: t_stats
                .iter()
                .map(|&t| two_sided_p_value(t, df))
                .collect::<Result<Vec<_>>>()?,
        },
    };

    let y = design.y();
    let fitted_vec = design.x() * &base.coefficients;
    let fitted: Vec<f64> = fitted_vec.iter().copied().collect();
    let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(v, f)| v - f).collect();
    let statistics = FitStatistics::compute(
        y.as_slice(),
        &residuals,
        p,
        (n - p) as f64,
        design.has_intercept(),
    );

    let table = CoefficientTable::new(
        design.names().to_vec(),
        coefficients.clone(),
        &intervals,
        std_errors,
        t_stats,
        inference,
    )?;

    Ok(LinearFit {
        table,
        coefficients,
        fitted,
        residuals,
        statistics,
        estimator: if data.weights.is_some() {
            Estimator::Wls
        } else {
            Estimator::Ols
        },
        covariance,
        conf_int: options.conf_int,
        n_boot: options.n_boot,
        confidence_level: options.confidence_level.value(),
        df,
        n_obs: n,
        warnings,
    })
}

/// Degrees of freedom for t-based p-values and intervals
///
/// `G - p` for cluster-robust covariance, Welch-Satterthwaite for two
/// inverse-variance weight groups (when enabled), `n - p` otherwise.
fn inference_df(
    data: &RegressionData,
    options: &FitOptions,
    warnings: &mut Vec<FitWarning>,
) -> Result<f64> {
    let (n, p) = (data.design.n_obs(), data.design.n_coefs());

    if options.covariance == CovarianceType::Cluster {
        let groups = data.clusters.as_deref().map_or(0, group_count);
        if groups <= p {
            return Err(Error::InvalidInput(format!(
                "cluster-robust inference needs more clusters ({groups}) than coefficients ({p})"
            )));
        }
        return Ok((groups - p) as f64);
    }

    if let (Some(Weights::GroupVariance(groups)), true) =
        (&data.weights, options.wls_dof_correction)
    {
        match welch_satterthwaite(data.design.y().as_slice(), groups)? {
            Some(df) => return Ok(df),
            None => record(
                warnings,
                FitWarning::WelchGroupCount {
                    groups: group_count(groups),
                },
            ),
        }
    }

    Ok((n - p) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignMatrix;
    use approx::assert_relative_eq;

    fn noisy_line() -> RegressionData {
        let x: Vec<f64> = (0..40).map(|i| i as f64 / 4.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 + 3.0 * v + ((i * 7919) % 13) as f64 / 13.0 - 0.5)
            .collect();
        RegressionData::new(DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap())
    }

    #[test]
    fn test_parametric_fit() {
        let fit = fit_linear(&noisy_line(), &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 0.05);
        assert_eq!(fit.df, 38.0);
        assert_eq!(fit.estimator, Estimator::Ols);
        assert_eq!(fit.sig_type(), "parametric");
        assert_eq!(fit.se_type(), "non-robust");
        assert_eq!(fit.ci_type(), "standard");
        assert!(fit.warnings.is_empty());
        let row = fit.table.get("x").unwrap();
        assert!(row.p_value.unwrap() < 1e-10);
        assert_eq!(row.sig, "***");
        assert!(fit.statistics.r_squared > 0.99);
    }

    #[test]
    fn test_residuals_sum_to_zero_with_intercept() {
        let fit = fit_linear(&noisy_line(), &FitOptions::default()).unwrap();
        let total: f64 = fit.residuals.iter().sum();
        assert!(total.abs() < 1e-9);
    }

    #[test]
    fn test_cluster_needs_assignment() {
        let opts = FitOptions::default().with_covariance(CovarianceType::Cluster);
        let err = fit_linear(&noisy_line(), &opts).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_cluster_df() {
        let clusters: Vec<usize> = (0..40).map(|i| i / 5).collect();
        let data = noisy_line().with_clusters(clusters).unwrap();
        let opts = FitOptions::default().with_covariance(CovarianceType::Cluster);
        let fit = fit_linear(&data, &opts).unwrap();
        assert_eq!(fit.df, 6.0);
        match fit.table.inference() {
            Inference::Parametric { df, .. } => assert_eq!(df, &vec![6.0, 6.0]),
            other => panic!("unexpected inference {other:?}"),
        }
    }

    #[test]
    fn test_too_few_clusters() {
        let clusters: Vec<usize> = (0..40).map(|i| i / 20).collect();
        let data = noisy_line().with_clusters(clusters).unwrap();
        let opts = FitOptions::default().with_covariance(CovarianceType::Cluster);
        assert!(matches!(fit_linear(&data, &opts), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_low_permutation_warning() {
        let opts = FitOptions::default().with_permute(50).with_seed(1);
        let fit = fit_linear(&noisy_line(), &opts).unwrap();
        assert_eq!(
            fit.warnings,
            vec![FitWarning::LowPermutationCount { n_perm: 50 }]
        );
        assert_eq!(fit.table.columns()[4], "Num_perm");
        assert_eq!(fit.sig_type(), "permutation (50)");
    }

    #[test]
    fn test_welch_warning_with_three_groups() {
        let groups: Vec<usize> = (0..40).map(|i| i % 3).collect();
        let data = noisy_line()
            .with_weights(Weights::GroupVariance(groups))
            .unwrap();
        let fit = fit_linear(&data, &FitOptions::default()).unwrap();
        assert_eq!(fit.estimator, Estimator::Wls);
        assert_eq!(fit.df, 38.0);
        assert_eq!(fit.warnings, vec![FitWarning::WelchGroupCount { groups: 3 }]);
    }

    #[test]
    fn test_bootstrap_table() {
        let opts = FitOptions::default()
            .with_conf_int(ConfInt::Boot)
            .with_n_boot(200)
            .with_seed(17);
        let fit = fit_linear(&noisy_line(), &opts).unwrap();
        assert_eq!(fit.table.columns().len(), 6);
        assert_eq!(fit.ci_type(), "boot (200)");
        assert_eq!(fit.sig_type(), "bootstrapped");
        assert_eq!(fit.table.get("x").unwrap().sig, "*");
    }

    #[test]
    fn test_warning_display() {
        let w = FitWarning::FailedResamples {
            failed: 3,
            requested: 100,
        };
        assert!(w.to_string().contains("3 of 100"));
    }
}
