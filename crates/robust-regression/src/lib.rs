//! Least-squares regression with robust inference
//!
//! This crate fits ordinary and weighted least-squares models on a plain
//! numeric [`DesignMatrix`] and reports coefficient tables under several
//! inference regimes:
//!
//! - **Covariance**: classical, HC0-HC3 sandwich estimators, Newey-West
//!   (HAC) and cluster-robust
//! - **Degrees of freedom**: `n - p`, `G - p` for clusters, or
//!   Welch-Satterthwaite for two inverse-variance weight groups
//! - **Intervals**: Student-t or percentile bootstrap
//! - **p-values**: parametric or response permutation
//!
//! Resampling runs on a [`robust_core::Engine`], sequentially or on a
//! Rayon pool, with one seed per task so results are reproducible.
//!
//! # Example
//!
//! ```rust
//! use robust_regression::{fit_linear, CovarianceType, DesignMatrix, FitOptions, RegressionData};
//!
//! let x: Vec<f64> = (0..50).map(|i| i as f64 / 5.0).collect();
//! let y: Vec<f64> = x.iter().enumerate()
//!     .map(|(i, v)| 2.0 + 3.0 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
//!     .collect();
//!
//! let design = DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap();
//! let options = FitOptions::default().with_covariance(CovarianceType::Hc3);
//! let fit = fit_linear(&RegressionData::new(design), &options).unwrap();
//!
//! let slope = fit.table.get("x").unwrap();
//! assert!((slope.estimate - 3.0).abs() < 0.01);
//! assert_eq!(fit.se_type(), "robust (hc3)");
//! ```

pub mod correlation;
pub mod covariance;
pub mod design;
pub mod estimator;
pub mod fit;
pub mod inference;
pub mod options;
pub mod resample;
pub mod stats;
pub mod table;
pub mod two_stage;
pub mod weights;

pub use correlation::{fisher_z, predictor_correlations};
pub use covariance::{covariance_matrix, ols, standard_errors, CovarianceContext, OlsFit};
pub use design::{encode_labels, DesignMatrix, RegressionData, INTERCEPT};
pub use estimator::{least_squares, LeastSquares};
pub use fit::{
    fit_linear, fit_linear_with_engine, Estimator, FitWarning, LinearFit,
    MIN_RECOMMENDED_PERMUTATIONS,
};
pub use inference::{permutation_p_value, sig_stars};
pub use options::{
    ConfInt, CorrelationType, CovarianceType, Family, FitOptions, PermutationScheme,
    PermutationStatistic, Robust,
};
pub use stats::FitStatistics;
pub use table::{CoefficientRow, CoefficientTable, Inference};
pub use two_stage::{fit_two_stage, TwoStageFit, TwoStageOptions};
pub use weights::{welch_satterthwaite, Weights};

// Re-export core types
pub use robust_confidence::{ConfidenceInterval, ConfidenceLevel};
pub use robust_core::{Error, Result};
