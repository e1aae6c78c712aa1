//! Two-stage ("summary statistics") regression
//!
//! A separate least-squares fit per group produces one coefficient vector
//! per group; each coefficient is then tested across groups with an
//! intercept-only second-level model.

use robust_confidence::ConfidenceInterval;
use robust_core::{utils, Engine, Error, ExecutionEngine, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::correlation::{fisher_z, predictor_correlations};
use crate::design::{group_rows, DesignMatrix, RegressionData};
use crate::estimator::least_squares;
use crate::fit::{
    describe_ci, describe_se, describe_sig, fit_linear_with_engine, record, FitWarning,
    MIN_RECOMMENDED_PERMUTATIONS,
};
use crate::inference::permutation_p_value;
use crate::options::{
    ConfInt, CorrelationType, CovarianceType, FitOptions, PermutationStatistic,
};
use crate::resample::{one_sample_statistic, sign_flip_statistics};
use crate::table::{CoefficientTable, Inference};

/// Options for a two-stage fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoStageOptions {
    /// Options for every second-level model; its `permute` is ignored
    pub second_level: FitOptions,
    /// Number of sign-flip permutations
    pub permute: Option<usize>,
    pub perm_on: PermutationStatistic,
    /// Summarise each group by predictor correlations instead of betas
    pub to_corrs: Option<CorrelationType>,
    /// Fisher-z transform first-level correlations
    pub ztrans_corrs: bool,
}

impl Default for TwoStageOptions {
    fn default() -> Self {
        Self {
            second_level: FitOptions::default(),
            permute: None,
            perm_on: PermutationStatistic::TStat,
            to_corrs: None,
            ztrans_corrs: true,
        }
    }
}

impl TwoStageOptions {
    pub fn with_second_level(mut self, options: FitOptions) -> Self {
        self.second_level = options;
        self
    }

    pub fn with_permute(mut self, permute: usize) -> Self {
        self.permute = (permute > 0).then_some(permute);
        self
    }

    pub fn with_perm_on(mut self, statistic: PermutationStatistic) -> Self {
        self.perm_on = statistic;
        self
    }

    pub fn with_to_corrs(mut self, kind: CorrelationType) -> Self {
        self.to_corrs = Some(kind);
        self
    }

    pub fn with_ztrans_corrs(mut self, enabled: bool) -> Self {
        self.ztrans_corrs = enabled;
        self
    }
}

/// Result of a two-stage fit
#[derive(Debug, Clone, Serialize)]
pub struct TwoStageFit {
    pub table: CoefficientTable,
    /// One row of first-level estimates per group, in group-code order
    pub first_level: Vec<Vec<f64>>,
    /// Column names of `first_level`
    pub first_level_names: Vec<String>,
    pub n_groups: usize,
    pub covariance: CovarianceType,
    pub conf_int: ConfInt,
    pub n_boot: usize,
    pub to_corrs: Option<CorrelationType>,
    pub warnings: Vec<FitWarning>,
}

impl TwoStageFit {
    pub fn se_type(&self) -> String {
        describe_se(self.covariance)
    }

    pub fn ci_type(&self) -> String {
        describe_ci(self.conf_int, self.n_boot)
    }

    pub fn sig_type(&self) -> String {
        describe_sig(self.table.inference())
    }
}

/// Fit one model per group of `groups` and test each coefficient across groups
#[instrument(skip(design, groups, options), fields(n_obs = design.n_obs()))]
pub fn fit_two_stage(
    design: &DesignMatrix,
    groups: &[usize],
    options: &TwoStageOptions,
) -> Result<TwoStageFit> {
    let second = &options.second_level;
    second.validate()?;
    if second.covariance == CovarianceType::Cluster {
        return Err(Error::InvalidParameter(
            "cluster covariance is not available for two-stage models".to_string(),
        ));
    }
    if groups.len() != design.n_obs() {
        return Err(Error::size_mismatch(design.n_obs(), groups.len(), "group assignment"));
    }

    let rows: Vec<Vec<usize>> = group_rows(groups)
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();
    let n_groups = rows.len();
    if n_groups < 2 {
        return Err(Error::InsufficientData {
            expected: 2,
            actual: n_groups,
        });
    }

    let first_level_names: Vec<String> = match options.to_corrs {
        Some(_) => {
            let intercept = design.intercept_index();
            design
                .names()
                .iter()
                .enumerate()
                .filter(|(j, _)| Some(*j) != intercept)
                .map(|(_, n)| n.clone())
                .collect()
        }
        None => design.names().to_vec(),
    };
    if first_level_names.is_empty() {
        return Err(Error::InvalidInput(
            "correlations need at least one non-intercept predictor".to_string(),
        ));
    }

    let engine = Engine::from_jobs(second.n_jobs)?;
    debug!("Fitting {} first-level models", n_groups);
    let first_level = engine
        .execute_batch(n_groups, |g| {
            let group_design = design.select_rows(&rows[g]);
            first_level_estimates(&group_design, options.to_corrs, options.ztrans_corrs)
        })
        .into_iter()
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let mut warnings = Vec::new();
    if let Some(n_perm) = options.permute {
        if n_perm < MIN_RECOMMENDED_PERMUTATIONS {
            record(&mut warnings, FitWarning::LowPermutationCount { n_perm });
        }
    }

    let k = first_level_names.len();
    let seeds = utils::derive_seeds(second.seed, 2 * k);
    let mut estimates = Vec::with_capacity(k);
    let mut intervals = Vec::with_capacity(k);
    let mut std_errors = Vec::with_capacity(k);
    let mut t_stats = Vec::with_capacity(k);
    let mut dfs = Vec::with_capacity(k);
    let mut p_values = Vec::with_capacity(k);
    let mut perm_p_values = Vec::with_capacity(k);

    for j in 0..k {
        let values: Vec<f64> = first_level.iter().map(|row| row[j]).collect();
        let data = RegressionData::new(DesignMatrix::intercept_only(&values)?);
        let mut level_options = second.clone();
        level_options.permute = None;
        level_options.seed = Some(seeds[2 * j]);

        let fit = fit_linear_with_engine(&data, &level_options, &engine)?;
        let row = fit
            .table
            .row(0)
            .ok_or_else(|| Error::Computation("empty second-level table".to_string()))?;
        estimates.push(row.estimate);
        intervals.push(ConfidenceInterval::new(
            row.ci_lower,
            row.ci_upper,
            row.estimate,
            fit.confidence_level,
        ));
        std_errors.push(row.std_error);
        t_stats.push(row.t_stat);
        dfs.push(fit.df);
        p_values.push(row.p_value.unwrap_or(f64::NAN));
        warnings.extend(fit.warnings);

        if let Some(n_perm) = options.permute {
            let null = sign_flip_statistics(
                &engine,
                &values,
                options.perm_on,
                n_perm,
                Some(seeds[2 * j + 1]),
            );
            let observed = one_sample_statistic(&values, options.perm_on);
            perm_p_values.push(permutation_p_value(&null, observed));
        }
    }

    let inference = match options.permute {
        Some(n_perm) => Inference::Permutation {
            n_perm,
            p_values: perm_p_values,
        },
        None if second.conf_int == ConfInt::Boot => Inference::Bootstrapped {
            n_boot: second.n_boot,
        },
        None => Inference::Parametric {
            df: dfs,
            p_values,
        },
    };

    let table = CoefficientTable::new(
        first_level_names.clone(),
        estimates,
        &intervals,
        std_errors,
        t_stats,
        inference,
    )?;

    Ok(TwoStageFit {
        table,
        first_level,
        first_level_names,
        n_groups,
        covariance: second.covariance,
        conf_int: second.conf_int,
        n_boot: second.n_boot,
        to_corrs: options.to_corrs,
        warnings,
    })
}

fn first_level_estimates(
    design: &DesignMatrix,
    to_corrs: Option<CorrelationType>,
    ztrans: bool,
) -> Result<Vec<f64>> {
    match to_corrs {
        Some(kind) => {
            let corrs = predictor_correlations(design, kind)?;
            Ok(if ztrans {
                corrs.into_iter().map(fisher_z).collect()
            } else {
                corrs
            })
        }
        None => {
            let fit = least_squares(design.x(), design.y(), None)?;
            Ok(fit.coefficients.iter().copied().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Ten groups of twelve rows with group-specific slopes around 1.5
    fn grouped() -> (DesignMatrix, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut groups = Vec::new();
        for g in 0..10 {
            let slope = 1.5 + (g as f64 - 4.5) * 0.1;
            for i in 0..12 {
                let xi = i as f64;
                let noise = ((g * 31 + i * 17) % 7) as f64 / 7.0 - 0.5;
                x.push(xi);
                y.push(0.5 + slope * xi + noise);
                groups.push(g);
            }
        }
        (
            DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap(),
            groups,
        )
    }

    #[test]
    fn test_second_level_mean_of_slopes() {
        let (design, groups) = grouped();
        let fit = fit_two_stage(&design, &groups, &TwoStageOptions::default()).unwrap();
        assert_eq!(fit.n_groups, 10);
        assert_eq!(fit.first_level.len(), 10);
        let slopes: Vec<f64> = fit.first_level.iter().map(|r| r[1]).collect();
        let row = fit.table.get("x").unwrap();
        assert_relative_eq!(row.estimate, utils::mean(&slopes), epsilon = 1e-10);
        assert_eq!(fit.table.numeric_column("DF"), Some(vec![9.0, 9.0]));
        assert_eq!(fit.sig_type(), "parametric");
    }

    #[test]
    fn test_rejects_cluster() {
        let (design, groups) = grouped();
        let opts = TwoStageOptions::default().with_second_level(
            FitOptions::default().with_covariance(CovarianceType::Cluster),
        );
        assert!(matches!(
            fit_two_stage(&design, &groups, &opts),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_corrs_drop_intercept() {
        let (design, groups) = grouped();
        let opts = TwoStageOptions::default().with_to_corrs(CorrelationType::Semi);
        let fit = fit_two_stage(&design, &groups, &opts).unwrap();
        assert_eq!(fit.table.names(), &["x".to_string()]);
        assert_eq!(fit.first_level[0].len(), 1);
    }

    #[test]
    fn test_sign_flip_permutation() {
        let (design, groups) = grouped();
        let opts = TwoStageOptions::default()
            .with_permute(200)
            .with_perm_on(PermutationStatistic::Mean)
            .with_second_level(FitOptions::default().with_seed(4));
        let fit = fit_two_stage(&design, &groups, &opts).unwrap();
        assert_eq!(fit.table.columns()[6], "Perm-P-val");
        // every group slope is positive, so no flip is as extreme as observed
        let p = fit.table.get("x").unwrap().p_value.unwrap();
        assert!(p < 0.05);
        assert!(fit
            .warnings
            .contains(&FitWarning::LowPermutationCount { n_perm: 200 }));
    }

    #[test]
    fn test_single_group_is_insufficient() {
        let (design, _) = grouped();
        let groups = vec![0; design.n_obs()];
        assert!(matches!(
            fit_two_stage(&design, &groups, &TwoStageOptions::default()),
            Err(Error::InsufficientData { .. })
        ));
    }
}
