//! Goodness-of-fit and small descriptive statistics

use robust_core::utils;
use serde::Serialize;
use std::f64::consts::PI;

/// Model-level fit summaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitStatistics {
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl FitStatistics {
    /// Summaries for a fit with `n_coefs` coefficients
    ///
    /// With an intercept the total sum of squares is centred; without one
    /// it is taken about zero.
    pub fn compute(
        y: &[f64],
        residuals: &[f64],
        n_coefs: usize,
        df_resid: f64,
        centered: bool,
    ) -> Self {
        let r2 = r_squared(y, residuals, centered);
        let ll = log_likelihood(residuals);
        let n = y.len() as f64;
        Self {
            r_squared: r2,
            adj_r_squared: adjusted_r_squared(r2, y.len(), df_resid, centered),
            log_likelihood: ll,
            aic: 2.0 * n_coefs as f64 - 2.0 * ll,
            bic: n.ln() * n_coefs as f64 - 2.0 * ll,
        }
    }
}

/// `1 - SSR / TSS`
pub fn r_squared(y: &[f64], residuals: &[f64], centered: bool) -> f64 {
    let center = if centered { utils::mean(y) } else { 0.0 };
    let tss: f64 = y.iter().map(|v| (v - center).powi(2)).sum();
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    1.0 - ssr / tss
}

/// Adjusted R², penalised by the residual degrees of freedom
pub fn adjusted_r_squared(r2: f64, n_obs: usize, df_resid: f64, centered: bool) -> f64 {
    let n = n_obs as f64;
    let numerator = if centered { n - 1.0 } else { n };
    1.0 - numerator / df_resid * (1.0 - r2)
}

/// Gaussian log-likelihood at the maximum likelihood variance `SSR / n`
pub fn log_likelihood(residuals: &[f64]) -> f64 {
    let n = residuals.len() as f64;
    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    let half_n = n / 2.0;
    -ssr.ln() * half_n - (1.0 + (PI / half_n).ln()) * half_n
}

/// Pearson correlation
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (utils::mean(a), utils::mean(b));
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - ma, y - mb);
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    sab / (saa * sbb).sqrt()
}

/// One-sample t statistic against zero
pub fn one_sample_t(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    utils::mean(values) / (utils::std_dev(values) / n.sqrt())
}
