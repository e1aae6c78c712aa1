//! Configuration types for `Lm` and `Lm2`

use robust_regression::{
    ConfInt, ConfidenceLevel, CorrelationType, CovarianceType, FitOptions, PermutationScheme,
    PermutationStatistic, Robust, TwoStageOptions,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Source of inverse-variance weights for WLS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WeightsSpec {
    /// Group column; each row gets `1 / var(response)` of its group
    Column(String),
    /// One explicit weight per row of the input data
    Values(Vec<f64>),
}

/// Options for fitting an [`Lm`](crate::Lm)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmOptions {
    /// `true` selects hc1
    pub robust: Robust,
    pub conf_int: ConfInt,
    pub permute: Option<usize>,
    pub n_boot: usize,
    pub n_jobs: usize,
    pub n_lags: usize,
    /// Cluster column for cluster-robust covariance
    pub cluster: Option<String>,
    pub weights: Option<WeightsSpec>,
    pub wls_dof_correction: bool,
    /// Regress average ranks instead of raw values
    pub rank: bool,
    pub permutation_scheme: PermutationScheme,
    pub confidence_level: ConfidenceLevel,
    pub seed: Option<u64>,
}

impl Default for LmOptions {
    fn default() -> Self {
        let base = FitOptions::default();
        Self {
            robust: Robust::Off,
            conf_int: base.conf_int,
            permute: None,
            n_boot: base.n_boot,
            n_jobs: base.n_jobs,
            n_lags: base.n_lags,
            cluster: None,
            weights: None,
            wls_dof_correction: base.wls_dof_correction,
            rank: false,
            permutation_scheme: base.permutation_scheme,
            confidence_level: base.confidence_level,
            seed: None,
        }
    }
}

impl LmOptions {
    pub fn with_robust(mut self, robust: Robust) -> Self {
        self.robust = robust;
        self
    }

    pub fn with_conf_int(mut self, conf_int: ConfInt) -> Self {
        self.conf_int = conf_int;
        self
    }

    pub fn with_permute(mut self, permute: usize) -> Self {
        self.permute = (permute > 0).then_some(permute);
        self
    }

    pub fn with_n_boot(mut self, n_boot: usize) -> Self {
        self.n_boot = n_boot;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_n_lags(mut self, n_lags: usize) -> Self {
        self.n_lags = n_lags;
        self
    }

    pub fn with_cluster(mut self, column: impl Into<String>) -> Self {
        self.cluster = Some(column.into());
        self
    }

    pub fn with_weights(mut self, weights: WeightsSpec) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_wls_dof_correction(mut self, enabled: bool) -> Self {
        self.wls_dof_correction = enabled;
        self
    }

    pub fn with_rank(mut self, rank: bool) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_permutation_scheme(mut self, scheme: PermutationScheme) -> Self {
        self.permutation_scheme = scheme;
        self
    }

    pub fn with_confidence_level(mut self, level: ConfidenceLevel) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Covariance estimator after resolving `robust = true`
    pub fn covariance(&self) -> CovarianceType {
        self.robust.resolve(CovarianceType::Hc1)
    }

    /// Engine options; the cluster column must be set for cluster covariance
    pub(crate) fn fit_options(&self) -> Result<FitOptions> {
        let covariance = self.covariance();
        if covariance == CovarianceType::Cluster && self.cluster.is_none() {
            return Err(Error::InvalidParameter(
                "robust = 'cluster' requires a cluster column".to_string(),
            ));
        }
        if self.permutation_scheme == PermutationScheme::WithinClusters && self.cluster.is_none() {
            return Err(Error::InvalidParameter(
                "within-cluster permutation requires a cluster column".to_string(),
            ));
        }
        Ok(FitOptions {
            covariance,
            conf_int: self.conf_int,
            permute: self.permute,
            n_boot: self.n_boot,
            n_jobs: self.n_jobs,
            n_lags: self.n_lags,
            wls_dof_correction: self.wls_dof_correction,
            permutation_scheme: self.permutation_scheme,
            confidence_level: self.confidence_level,
            seed: self.seed,
        })
    }
}

/// Options for fitting an [`Lm2`](crate::Lm2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lm2Options {
    /// `true` selects hc0
    pub robust: Robust,
    pub conf_int: ConfInt,
    /// Number of sign-flip permutations
    pub permute: Option<usize>,
    pub perm_on: PermutationStatistic,
    pub n_boot: usize,
    pub n_jobs: usize,
    pub n_lags: usize,
    /// Rank within each group before the first-level fits
    pub rank: bool,
    pub to_corrs: Option<CorrelationType>,
    pub ztrans_corrs: bool,
    pub confidence_level: ConfidenceLevel,
    pub seed: Option<u64>,
}

impl Default for Lm2Options {
    fn default() -> Self {
        let base = TwoStageOptions::default();
        Self {
            robust: Robust::Off,
            conf_int: base.second_level.conf_int,
            permute: None,
            perm_on: base.perm_on,
            n_boot: base.second_level.n_boot,
            n_jobs: base.second_level.n_jobs,
            n_lags: base.second_level.n_lags,
            rank: false,
            to_corrs: None,
            ztrans_corrs: base.ztrans_corrs,
            confidence_level: base.second_level.confidence_level,
            seed: None,
        }
    }
}

impl Lm2Options {
    pub fn with_robust(mut self, robust: Robust) -> Self {
        self.robust = robust;
        self
    }

    pub fn with_conf_int(mut self, conf_int: ConfInt) -> Self {
        self.conf_int = conf_int;
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

    pub fn with_n_boot(mut self, n_boot: usize) -> Self {
        self.n_boot = n_boot;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_n_lags(mut self, n_lags: usize) -> Self {
        self.n_lags = n_lags;
        self
    }

    pub fn with_rank(mut self, rank: bool) -> Self {
        self.rank = rank;
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

    pub fn with_confidence_level(mut self, level: ConfidenceLevel) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn covariance(&self) -> CovarianceType {
        self.robust.resolve(CovarianceType::Hc0)
    }

    pub(crate) fn two_stage_options(&self) -> TwoStageOptions {
        let second_level = FitOptions {
            covariance: self.covariance(),
            conf_int: self.conf_int,
            permute: None,
            n_boot: self.n_boot,
            n_jobs: self.n_jobs,
            n_lags: self.n_lags,
            wls_dof_correction: false,
            permutation_scheme: PermutationScheme::Global,
            confidence_level: self.confidence_level,
            seed: self.seed,
        };
        TwoStageOptions {
            second_level,
            permute: self.permute,
            perm_on: self.perm_on,
            to_corrs: self.to_corrs,
            ztrans_corrs: self.ztrans_corrs,
        }
    }
}
