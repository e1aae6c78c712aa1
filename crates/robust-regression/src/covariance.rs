//! Coefficient covariance estimators
//!
//! Every robust estimator is a sandwich `B M B` with bread `B = (XᵀX)⁻¹`
//! and an estimator-specific meat `M`, computed on the working (weighted)
//! design and residuals of a [`LeastSquares`] fit.

use nalgebra::{DMatrix, DVector};
use robust_core::{Error, Result};
use tracing::debug;

use crate::design::group_rows;
use crate::estimator::{least_squares, LeastSquares};
use crate::options::CovarianceType;

/// Extra inputs some estimators need
#[derive(Debug, Clone, Copy, Default)]
pub struct CovarianceContext<'a> {
    /// Lag window for [`CovarianceType::Hac`]
    pub n_lags: usize,
    /// Cluster code per row for [`CovarianceType::Cluster`]
    pub clusters: Option<&'a [usize]>,
}

impl<'a> CovarianceContext<'a> {
    pub fn new(n_lags: usize, clusters: Option<&'a [usize]>) -> Self {
        Self { n_lags, clusters }
    }
}

/// Covariance matrix of the coefficients of `fit`
pub fn covariance_matrix(
    fit: &LeastSquares,
    kind: CovarianceType,
    ctx: &CovarianceContext<'_>,
) -> Result<DMatrix<f64>> {
    let n = fit.n_obs();
    let p = fit.n_coefs();

    let meat = match kind {
        CovarianceType::Classical => {
            if n <= p {
                return Err(Error::InsufficientData {
                    expected: p + 1,
                    actual: n,
                });
            }
            let sigma2 = fit.ssr() / (n - p) as f64;
            return Ok(&fit.bread * sigma2);
        }
        CovarianceType::Hc0 | CovarianceType::Hc1 => scaled_cross_product(fit, |_, r| r),
        CovarianceType::Hc2 => {
            let h = fit.leverage();
            let scale = leverage_scale(&h, 0.5)?;
            scaled_cross_product(fit, |i, r| r * scale[i])
        }
        CovarianceType::Hc3 => {
            let h = fit.leverage();
            let scale = leverage_scale(&h, 1.0)?;
            scaled_cross_product(fit, |i, r| r * scale[i])
        }
        CovarianceType::Hac => hac_meat(fit, ctx.n_lags),
        CovarianceType::Cluster => {
            let clusters = ctx.clusters.ok_or_else(|| {
                Error::InvalidParameter(
                    "cluster covariance requires a cluster assignment".to_string(),
                )
            })?;
            cluster_meat(fit, clusters)?
        }
    };

    let mut vcv = &fit.bread * meat * &fit.bread;
    if kind == CovarianceType::Hc1 {
        if n <= p {
            return Err(Error::InsufficientData {
                expected: p + 1,
                actual: n,
            });
        }
        vcv *= n as f64 / (n - p) as f64;
    }
    Ok(vcv)
}

/// Standard errors from a covariance matrix
///
/// Tiny negative diagonals produced by rounding are clamped to zero.
pub fn standard_errors(vcv: &DMatrix<f64>) -> DVector<f64> {
    vcv.diagonal().map(|v| v.max(0.0).sqrt())
}

/// `(X .* s)ᵀ (X .* s)` with `s_i = f(i, r_i)`
fn scaled_cross_product<F>(fit: &LeastSquares, f: F) -> DMatrix<f64>
where
    F: Fn(usize, f64) -> f64,
{
    let v = scores(fit, f);
    v.transpose() * &v
}

/// Per-row scores `x_i · s_i`
fn scores<F>(fit: &LeastSquares, f: F) -> DMatrix<f64>
where
    F: Fn(usize, f64) -> f64,
{
    let x = &fit.working_x;
    let s: Vec<f64> = fit
        .residuals
        .iter()
        .enumerate()
        .map(|(i, &r)| f(i, r))
        .collect();
    DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] * s[i])
}

/// `(1 - h_i)^(-power)`, failing for observations with leverage one
fn leverage_scale(h: &DVector<f64>, power: f64) -> Result<Vec<f64>> {
    h.iter()
        .map(|&hi| {
            let room = 1.0 - hi;
            if room <= f64::EPSILON {
                Err(Error::Computation(
                    "observation with leverage 1; HC2/HC3 are undefined".to_string(),
                ))
            } else {
                Ok(room.powf(-power))
            }
        })
        .collect()
}

/// Newey-West meat with Bartlett weights `w_l = 1 - l / (L + 1)`
fn hac_meat(fit: &LeastSquares, n_lags: usize) -> DMatrix<f64> {
    let v = scores(fit, |_, r| r);
    let n = v.nrows();
    let lags = n_lags.min(n.saturating_sub(1));
    if lags < n_lags {
        debug!("HAC lag window {} truncated to {}", n_lags, lags);
    }

    let mut meat = v.transpose() * &v;
    for l in 1..=lags {
        let weight = 1.0 - l as f64 / (n_lags as f64 + 1.0);
        let lead = v.rows(l, n - l);
        let lagged = v.rows(0, n - l);
        let gamma = lead.transpose() * lagged;
        meat += (&gamma + gamma.transpose()) * weight;
    }
    meat
}

/// `Σ_g (X_gᵀ r_g)(X_gᵀ r_g)ᵀ`
fn cluster_meat(fit: &LeastSquares, clusters: &[usize]) -> Result<DMatrix<f64>> {
    let n = fit.n_obs();
    let p = fit.n_coefs();
    if clusters.len() != n {
        return Err(Error::size_mismatch(n, clusters.len(), "cluster assignment"));
    }

    let mut meat = DMatrix::<f64>::zeros(p, p);
    for rows in group_rows(clusters).iter().filter(|r| !r.is_empty()) {
        let mut score = DVector::<f64>::zeros(p);
        for &i in rows {
            let r = fit.residuals[i];
            for j in 0..p {
                score[j] += fit.working_x[(i, j)] * r;
            }
        }
        meat += &score * score.transpose();
    }
    Ok(meat)
}

/// Coefficients with standard errors, t statistics and working residuals
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_stats: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Fit and compute inference quantities in one pass
pub fn ols(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: Option<&[f64]>,
    kind: CovarianceType,
    ctx: &CovarianceContext<'_>,
) -> Result<OlsFit> {
    let fit = least_squares(x, y, weights)?;
    let vcv = covariance_matrix(&fit, kind, ctx)?;
    let se = standard_errors(&vcv);
    let t_stats = fit
        .coefficients
        .iter()
        .zip(se.iter())
        .map(|(b, s)| b / s)
        .collect();
    Ok(OlsFit {
        coefficients: fit.coefficients.iter().copied().collect(),
        std_errors: se.iter().copied().collect(),
        t_stats,
        residuals: fit.residuals.iter().copied().collect(),
    })
}
