//! Formula-driven model objects over Polars `DataFrame`s

use std::fmt;

use polars::prelude::*;
use robust_regression::{
    fisher_z, fit_linear, fit_two_stage, predictor_correlations, CoefficientTable,
    CorrelationType, Family, FitStatistics, FitWarning, LinearFit, RegressionData, TwoStageFit,
    Weights,
};
use tracing::{debug, instrument};

use crate::config::{Lm2Options, LmOptions, WeightsSpec};
use crate::convert::{first_level_to_frame, table_to_frame};
use crate::design::{BuiltDesign, DesignBuilder, DesignInfo};
use crate::formula::Formula;
use crate::{Error, Result};

fn not_fitted() -> Error {
    Error::InvalidInput("model has not been fitted; call fit() first".to_string())
}

#[derive(Debug, Clone)]
struct FittedLm {
    fit: LinearFit,
    built: BuiltDesign,
}

/// Linear model fitted by OLS or WLS
///
/// ```rust
/// use polars::prelude::*;
/// use robust_polars::{Lm, LmOptions};
///
/// let df = df![
///     "y" => [1.1, 2.9, 5.2, 7.1, 8.8, 11.2],
///     "x" => [0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
/// ]
/// .unwrap();
/// let mut model = Lm::new("y ~ x", &df).unwrap();
/// let table = model.fit(&LmOptions::default()).unwrap();
/// assert_eq!(table.names(), &["Intercept", "x"]);
/// ```
#[derive(Debug, Clone)]
pub struct Lm {
    formula: Formula,
    data: DataFrame,
    family: Family,
    fitted: Option<FittedLm>,
}

impl Lm {
    pub fn new(formula: &str, data: &DataFrame) -> Result<Self> {
        Ok(Self {
            formula: Formula::parse(formula)?,
            data: data.clone(),
            family: Family::Gaussian,
            fitted: None,
        })
    }

    /// Set the error distribution by name; only `gaussian` can be fitted
    pub fn with_family(mut self, family: &str) -> Result<Self> {
        self.family = family.parse()?;
        Ok(self)
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    #[instrument(skip(self, options), fields(formula = %self.formula))]
    pub fn fit(&mut self, options: &LmOptions) -> Result<&CoefficientTable> {
        self.family.ensure_supported()?;
        let fit_options = options.fit_options()?;

        let mut builder = DesignBuilder::new(&self.formula).rank(options.rank);
        if let Some(cluster) = &options.cluster {
            builder = builder.with_auxiliary(cluster);
        }
        if let Some(WeightsSpec::Column(column)) = &options.weights {
            builder = builder.with_auxiliary(column);
        }
        let built = builder.build(&self.data)?;

        let mut data = RegressionData::new(built.design.clone());
        match &options.weights {
            Some(WeightsSpec::Column(column)) => {
                let (codes, _) = built.codes(column)?;
                data = data.with_weights(Weights::GroupVariance(codes))?;
            }
            Some(WeightsSpec::Values(values)) => {
                if values.len() != self.data.height() {
                    return Err(Error::InvalidInput(format!(
                        "expected {} weights, got {}",
                        self.data.height(),
                        values.len()
                    )));
                }
                data = data.with_weights(Weights::Explicit(built.align(values)?))?;
            }
            None => {}
        }
        if let Some(cluster) = &options.cluster {
            let (codes, levels) = built.codes(cluster)?;
            debug!("Clustering on '{}' with {} levels", cluster, levels.len());
            data = data.with_clusters(codes)?;
        }

        let fit = fit_linear(&data, &fit_options)?;
        let fitted = self.fitted.insert(FittedLm { fit, built });
        Ok(&fitted.fit.table)
    }

    fn fitted(&self) -> Result<&FittedLm> {
        self.fitted.as_ref().ok_or_else(not_fitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// The full fit result
    pub fn result(&self) -> Result<&LinearFit> {
        Ok(&self.fitted()?.fit)
    }

    pub fn coefs(&self) -> Result<&CoefficientTable> {
        Ok(&self.fitted()?.fit.table)
    }

    /// Coefficient table as a `DataFrame` with a leading `term` column
    pub fn coefs_frame(&self) -> Result<DataFrame> {
        table_to_frame(self.coefs()?)
    }

    pub fn fits(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.fit.fitted)
    }

    pub fn residuals(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.fit.residuals)
    }

    pub fn statistics(&self) -> Result<&FitStatistics> {
        Ok(&self.fitted()?.fit.statistics)
    }

    pub fn design_info(&self) -> Result<&DesignInfo> {
        Ok(&self.fitted()?.built.info)
    }

    /// Warnings raised by the last fit
    pub fn warnings(&self) -> &[FitWarning] {
        self.fitted
            .as_ref()
            .map(|f| f.fit.warnings.as_slice())
            .unwrap_or(&[])
    }

    /// Predictions for new rows
    pub fn predict(&self, data: &DataFrame) -> Result<Vec<f64>> {
        let fitted = self.fitted()?;
        let x = fitted.built.info.predictors(data)?;
        let beta = nalgebra::DVector::from_column_slice(&fitted.fit.coefficients);
        Ok((x * beta).iter().copied().collect())
    }

    /// Semi-partial or partial correlation of each predictor with the
    /// response, aligned with the coefficients; the intercept entry is NaN
    pub fn to_corrs(&self, kind: CorrelationType, ztrans: bool) -> Result<Vec<f64>> {
        let design = &self.fitted()?.built.design;
        let mut corrs = predictor_correlations(design, kind)?.into_iter();
        let intercept = design.intercept_index();
        Ok((0..design.n_coefs())
            .map(|j| {
                if Some(j) == intercept {
                    return f64::NAN;
                }
                let r = corrs.next().unwrap_or(f64::NAN);
                if ztrans {
                    fisher_z(r)
                } else {
                    r
                }
            })
            .collect())
    }

    /// Human-readable report of the last fit
    pub fn summary(&self) -> Result<String> {
        let summary = LmSummary {
            formula: &self.formula,
            family: self.family,
            fit: &self.fitted()?.fit,
        };
        Ok(summary.to_string())
    }
}

struct LmSummary<'a> {
    formula: &'a Formula,
    family: Family,
    fit: &'a LinearFit,
}

impl fmt::Display for LmSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fit = self.fit;
        let stats = &fit.statistics;
        writeln!(f, "Formula: {}", self.formula)?;
        writeln!(f, "Family: {}\tEstimator: {}", self.family, fit.estimator)?;
        writeln!(
            f,
            "Std-errors: {}\tCIs: {} {}%\tInference: {}",
            fit.se_type(),
            fit.ci_type(),
            fit.confidence_level * 100.0,
            fit.sig_type()
        )?;
        writeln!(
            f,
            "Number of observations: {}\t R^2: {:.3}\t R^2_adj: {:.3}",
            fit.n_obs, stats.r_squared, stats.adj_r_squared
        )?;
        writeln!(
            f,
            "Log-likelihood: {:.3}\t AIC: {:.3}\t BIC: {:.3}",
            stats.log_likelihood, stats.aic, stats.bic
        )?;
        writeln!(f)?;
        write!(f, "{}", fit.table)?;
        for warning in &fit.warnings {
            writeln!(f, "Warning: {warning}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct FittedLm2 {
    fit: TwoStageFit,
    levels: Vec<String>,
}

/// Two-stage model: one OLS fit per level of a grouping column, then a
/// second-level test of each coefficient across groups
#[derive(Debug, Clone)]
pub struct Lm2 {
    formula: Formula,
    group: String,
    data: DataFrame,
    family: Family,
    fitted: Option<FittedLm2>,
}

impl Lm2 {
    pub fn new(formula: &str, data: &DataFrame, group: &str) -> Result<Self> {
        data.column(group)
            .map_err(|_| Error::InvalidColumn(format!("group column '{group}' not found")))?;
        Ok(Self {
            formula: Formula::parse(formula)?,
            group: group.to_string(),
            data: data.clone(),
            family: Family::Gaussian,
            fitted: None,
        })
    }

    pub fn with_family(mut self, family: &str) -> Result<Self> {
        self.family = family.parse()?;
        Ok(self)
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    #[instrument(skip(self, options), fields(formula = %self.formula, group = %self.group))]
    pub fn fit(&mut self, options: &Lm2Options) -> Result<&CoefficientTable> {
        self.family.ensure_supported()?;

        let mut builder = DesignBuilder::new(&self.formula)
            .rank(options.rank)
            .with_auxiliary(&self.group);
        if options.rank {
            builder = builder.rank_within(&self.group);
        }
        let built = builder.build(&self.data)?;
        let (codes, levels) = built.codes(&self.group)?;
        debug!("Fitting {} groups of '{}'", levels.len(), self.group);

        let fit = fit_two_stage(&built.design, &codes, &options.two_stage_options())?;
        let fitted = self.fitted.insert(FittedLm2 { fit, levels });
        Ok(&fitted.fit.table)
    }

    fn fitted(&self) -> Result<&FittedLm2> {
        self.fitted.as_ref().ok_or_else(not_fitted)
    }

    pub fn result(&self) -> Result<&TwoStageFit> {
        Ok(&self.fitted()?.fit)
    }

    pub fn coefs(&self) -> Result<&CoefficientTable> {
        Ok(&self.fitted()?.fit.table)
    }

    pub fn coefs_frame(&self) -> Result<DataFrame> {
        table_to_frame(self.coefs()?)
    }

    /// Per-group estimates, one row per group level
    pub fn first_level(&self) -> Result<DataFrame> {
        let fitted = self.fitted()?;
        first_level_to_frame(
            &self.group,
            &fitted.levels,
            &fitted.fit.first_level_names,
            &fitted.fit.first_level,
        )
    }

    pub fn warnings(&self) -> &[FitWarning] {
        self.fitted
            .as_ref()
            .map(|f| f.fit.warnings.as_slice())
            .unwrap_or(&[])
    }

    pub fn summary(&self) -> Result<String> {
        let summary = Lm2Summary {
            formula: &self.formula,
            family: self.family,
            group: &self.group,
            fit: &self.fitted()?.fit,
        };
        Ok(summary.to_string())
    }
}

struct Lm2Summary<'a> {
    formula: &'a Formula,
    family: Family,
    group: &'a str,
    fit: &'a TwoStageFit,
}

impl fmt::Display for Lm2Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fit = self.fit;
        writeln!(f, "Formula: {}", self.formula)?;
        writeln!(f, "Family: {}\tGroups: {} ({})", self.family, self.group, fit.n_groups)?;
        let first_level = match fit.to_corrs {
            Some(CorrelationType::Semi) => "semi-partial correlations",
            Some(CorrelationType::Partial) => "partial correlations",
            None => "betas",
        };
        writeln!(f, "First level: {first_level}")?;
        writeln!(
            f,
            "Std-errors: {}\tCIs: {}\tInference: {}",
            fit.se_type(),
            fit.ci_type(),
            fit.sig_type()
        )?;
        writeln!(f)?;
        write!(f, "{}", fit.table)?;
        for warning in &fit.warnings {
            writeln!(f, "Warning: {warning}")?;
        }
        Ok(())
    }
}
