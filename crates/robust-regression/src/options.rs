//! Fit options and the string forms users select them with

use robust_confidence::ConfidenceLevel;
use robust_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coefficient covariance estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceType {
    /// `σ² (XᵀX)⁻¹`
    Classical,
    Hc0,
    Hc1,
    Hc2,
    Hc3,
    /// Newey-West with Bartlett weights
    Hac,
    /// Cluster-robust, one score sum per cluster
    Cluster,
}

impl CovarianceType {
    /// Names accepted by [`FromStr`]
    pub const NAMES: [&'static str; 6] = ["hc0", "hc1", "hc2", "hc3", "hac", "cluster"];

    pub fn as_str(&self) -> &'static str {
        match self {
            CovarianceType::Classical => "classical",
            CovarianceType::Hc0 => "hc0",
            CovarianceType::Hc1 => "hc1",
            CovarianceType::Hc2 => "hc2",
            CovarianceType::Hc3 => "hc3",
            CovarianceType::Hac => "hac",
            CovarianceType::Cluster => "cluster",
        }
    }

    pub fn is_robust(&self) -> bool {
        !matches!(self, CovarianceType::Classical)
    }
}

impl FromStr for CovarianceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hc0" => Ok(CovarianceType::Hc0),
            "hc1" => Ok(CovarianceType::Hc1),
            "hc2" => Ok(CovarianceType::Hc2),
            "hc3" => Ok(CovarianceType::Hc3),
            "hac" => Ok(CovarianceType::Hac),
            "cluster" => Ok(CovarianceType::Cluster),
            _ => Err(Error::unknown_option("robust", s, &Self::NAMES)),
        }
    }
}

impl fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-facing `robust` switch
///
/// `true` selects a model-specific default estimator, `false` the classical
/// covariance, and a name selects that estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Robust {
    #[default]
    Off,
    Default,
    Estimator(CovarianceType),
}

impl Robust {
    /// Concrete estimator, with `default` standing in for `Robust::Default`
    pub fn resolve(self, default: CovarianceType) -> CovarianceType {
        match self {
            Robust::Off => CovarianceType::Classical,
            Robust::Default => default,
            Robust::Estimator(kind) => kind,
        }
    }
}

impl From<bool> for Robust {
    fn from(robust: bool) -> Self {
        if robust {
            Robust::Default
        } else {
            Robust::Off
        }
    }
}

impl From<CovarianceType> for Robust {
    fn from(kind: CovarianceType) -> Self {
        Robust::Estimator(kind)
    }
}

impl FromStr for Robust {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "false" => Ok(Robust::Off),
            "true" => Ok(Robust::Default),
            other => other.parse().map(Robust::Estimator).map_err(|_| {
                Error::unknown_option(
                    "robust",
                    s,
                    &["true", "false", "hc0", "hc1", "hc2", "hc3", "hac", "cluster"],
                )
            }),
        }
    }
}

/// Confidence interval construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfInt {
    /// `estimate ± t(df) · SE`
    #[default]
    Standard,
    /// Percentiles of case-resampled estimates
    Boot,
}

impl FromStr for ConfInt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ConfInt::Standard),
            "boot" => Ok(ConfInt::Boot),
            _ => Err(Error::unknown_option("conf_int", s, &["standard", "boot"])),
        }
    }
}

impl fmt::Display for ConfInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfInt::Standard => f.write_str("standard"),
            ConfInt::Boot => f.write_str("boot"),
        }
    }
}

/// Error distribution of the model
///
/// Only the gaussian family is fitted; the other names are recognised so
/// that asking for them fails with a clear message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    #[default]
    Gaussian,
    Binomial,
    Gamma,
    InverseGaussian,
    Poisson,
}

impl Family {
    /// Fail unless the family can be fitted by least squares
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            Family::Gaussian => Ok(()),
            other => Err(Error::FeatureNotAvailable(format!(
                "family '{other}' is not implemented; only gaussian models are fitted"
            ))),
        }
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Family::Gaussian),
            "binomial" => Ok(Family::Binomial),
            "gamma" => Ok(Family::Gamma),
            "inverse_gaussian" | "inverse" => Ok(Family::InverseGaussian),
            "poisson" => Ok(Family::Poisson),
            _ => Err(Error::unknown_option(
                "family",
                s,
                &["gaussian", "binomial", "gamma", "inverse_gaussian", "poisson"],
            )),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Family::Gaussian => "gaussian",
            Family::Binomial => "binomial",
            Family::Gamma => "gamma",
            Family::InverseGaussian => "inverse_gaussian",
            Family::Poisson => "poisson",
        };
        f.write_str(name)
    }
}

/// Which response entries a permutation may exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermutationScheme {
    /// Shuffle the whole response vector
    #[default]
    Global,
    /// Shuffle only among rows sharing a cluster
    WithinClusters,
}

/// Statistic used by the sign-flip test of a two-stage model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PermutationStatistic {
    Mean,
    /// One-sample t statistic
    #[default]
    TStat,
}

impl FromStr for PermutationStatistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(PermutationStatistic::Mean),
            "t-stat" | "t_stat" | "tstat" => Ok(PermutationStatistic::TStat),
            _ => Err(Error::unknown_option("perm_on", s, &["mean", "t-stat"])),
        }
    }
}

/// Correlation summary of first-level predictors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationType {
    Semi,
    Partial,
}

impl FromStr for CorrelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "semi" => Ok(CorrelationType::Semi),
            "partial" => Ok(CorrelationType::Partial),
            _ => Err(Error::unknown_option("to_corrs", s, &["semi", "partial"])),
        }
    }
}

/// Options for a single least-squares fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitOptions {
    /// Covariance estimator (already resolved from the `robust` switch)
    pub covariance: CovarianceType,
    pub conf_int: ConfInt,
    /// Number of response permutations, `None` for parametric p-values
    pub permute: Option<usize>,
    pub n_boot: usize,
    /// 1 runs sequentially, 0 uses every core
    pub n_jobs: usize,
    /// Lag window for HAC covariance
    pub n_lags: usize,
    /// Replace the residual df with Welch-Satterthwaite under group weights
    pub wls_dof_correction: bool,
    pub permutation_scheme: PermutationScheme,
    pub confidence_level: ConfidenceLevel,
    pub seed: Option<u64>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            covariance: CovarianceType::Classical,
            conf_int: ConfInt::Standard,
            permute: None,
            n_boot: 500,
            n_jobs: 1,
            n_lags: 1,
            wls_dof_correction: true,
            permutation_scheme: PermutationScheme::Global,
            confidence_level: ConfidenceLevel::NINETY_FIVE,
            seed: None,
        }
    }
}

impl FitOptions {
    pub fn with_covariance(mut self, covariance: CovarianceType) -> Self {
        self.covariance = covariance;
        self
    }

    pub fn with_conf_int(mut self, conf_int: ConfInt) -> Self {
        self.conf_int = conf_int;
        self
    }

    /// Request a permutation test; zero permutations disables it
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

    pub fn with_wls_dof_correction(mut self, enabled: bool) -> Self {
        self.wls_dof_correction = enabled;
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

    pub(crate) fn validate(&self) -> Result<()> {
        if self.conf_int == ConfInt::Boot && self.n_boot == 0 {
            return Err(Error::InvalidParameter(
                "n_boot must be positive for bootstrapped intervals".to_string(),
            ));
        }
        if self.permute == Some(0) {
            return Err(Error::InvalidParameter(
                "permute must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
