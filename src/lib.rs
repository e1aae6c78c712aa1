//! Least-squares regression with robust inference
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`core`]: error type, execution engines and numeric helpers
//! - [`confidence`]: confidence interval types and bootstrap interval methods
//! - [`regression`]: the OLS/WLS engine with sandwich, cluster and Newey-West
//!   covariance estimators, bootstrap intervals and permutation tests
//! - [`polars`]: formula-driven `Lm`/`Lm2` models over Polars DataFrames
//!
//! # Example
//!
//! ```rust,ignore
//! use polars::prelude::*;
//! use robust_lm::polars::{Lm, LmOptions};
//!
//! let df = df!["y" => [1.0, 2.9, 5.2, 7.1, 8.8], "x" => [0.0, 1.0, 2.0, 3.0, 4.0]]?;
//! let mut model = Lm::new("y ~ x", &df)?;
//! model.fit(&LmOptions::default().with_robust("hc3".parse()?))?;
//! println!("{}", model.summary()?);
//! ```

pub use robust_confidence as confidence;
pub use robust_core as core;
#[cfg(feature = "polars")]
pub use robust_polars as polars;
pub use robust_regression as regression;

pub use robust_core::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
