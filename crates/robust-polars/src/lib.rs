//! Polars integration for robust regression
//!
//! Formula-driven linear models over Polars DataFrames. A formula such as
//! `"y ~ x + C(group)"` is turned into a design matrix (treatment coding
//! for categorical columns, rows with nulls dropped) and fitted with the
//! `robust-regression` engine.
//!
//! - [`Lm`]: OLS/WLS with classical, HC0-HC3, Newey-West or cluster
//!   standard errors, bootstrap intervals and permutation tests
//! - [`Lm2`]: two-stage regression, one fit per group followed by a
//!   second-level test across groups
//!
//! # Example
//!
//! ```rust
//! use polars::prelude::*;
//! use robust_polars::{LmOptions, RegressionExt};
//!
//! let df = df![
//!     "y" => [1.2, 2.8, 5.1, 7.3, 8.7, 11.0, 13.2, 14.9],
//!     "x" => [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
//! ]
//! .unwrap();
//!
//! let options = LmOptions::default().with_robust("hc3".parse().unwrap());
//! let model = df.lm("y ~ x", &options).unwrap();
//! let coefs = model.coefs_frame().unwrap();
//! assert_eq!(coefs.height(), 2);
//! ```

mod config;
mod convert;
mod design;
mod error;
mod formula;
mod models;
mod traits;

pub use config::{Lm2Options, LmOptions, WeightsSpec};
pub use convert::{first_level_to_frame, table_to_frame, TERM};
pub use design::{BuiltDesign, Coding, DesignBuilder, DesignInfo};
pub use error::{Error, Result};
pub use formula::{Factor, Formula, Term};
pub use models::{Lm, Lm2};
pub use traits::RegressionExt;

// Re-export commonly used types from the engine
pub use robust_regression::{
    CoefficientRow, CoefficientTable, ConfInt, ConfidenceLevel, CorrelationType, CovarianceType,
    Family, FitStatistics, FitWarning, Inference, LinearFit, PermutationScheme,
    PermutationStatistic, Robust, TwoStageFit,
};
