//! Extension trait for fitting regression models directly on a DataFrame

use polars::prelude::*;

use crate::{Lm, Lm2, Lm2Options, LmOptions, Result};

/// Extension trait for regression on Polars DataFrames
pub trait RegressionExt {
    /// Fit a linear model
    ///
    /// # Arguments
    /// * `formula` - Model formula, e.g. `"y ~ x + C(group)"`
    /// * `options` - Covariance, interval and resampling options
    ///
    /// # Returns
    /// The fitted model; its coefficient table is available via `coefs()`
    fn lm(&self, formula: &str, options: &LmOptions) -> Result<Lm>;

    /// Fit a two-stage model, one first-level regression per group
    ///
    /// # Arguments
    /// * `formula` - Model formula for the first-level fits
    /// * `group` - Column whose levels define the groups
    /// * `options` - Second-level and permutation options
    fn lm2(&self, formula: &str, group: &str, options: &Lm2Options) -> Result<Lm2>;
}

impl RegressionExt for DataFrame {
    fn lm(&self, formula: &str, options: &LmOptions) -> Result<Lm> {
        let mut model = Lm::new(formula, self)?;
        model.fit(options)?;
        Ok(model)
    }

    fn lm2(&self, formula: &str, group: &str, options: &Lm2Options) -> Result<Lm2> {
        let mut model = Lm2::new(formula, self, group)?;
        model.fit(options)?;
        Ok(model)
    }
}
