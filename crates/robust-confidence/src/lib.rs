//! Confidence interval estimation for regression coefficients
//!
//! This crate provides the two ways coefficient intervals are built:
//!
//! - **Student-t intervals**: `estimate ± t(1 - α/2, df) · se`
//! - **Bootstrap intervals**: percentiles of a resampled coefficient distribution
//!
//! # Examples
//!
//! ```rust
//! use robust_confidence::{
//!     coefficient_intervals, ConfidenceLevel, PercentileBootstrap, StudentsTInterval,
//! };
//!
//! let parametric = StudentsTInterval::default().interval(2.0, 0.25, 30.0).unwrap();
//! assert!(parametric.contains(2.0));
//!
//! let draws: Vec<Vec<f64>> = (0..200).map(|i| vec![1.0 + i as f64 / 200.0]).collect();
//! let boot = coefficient_intervals(
//!     &PercentileBootstrap,
//!     &draws,
//!     &[1.5],
//!     ConfidenceLevel::NINETY_FIVE,
//! )
//! .unwrap();
//! assert!(boot[0].lower < 1.5 && boot[0].upper > 1.5);
//! ```

mod asymptotic;
mod bootstrap_methods;
mod types;

// Re-exports
pub use asymptotic::{two_sided_p_value, StudentsTInterval};
pub use bootstrap_methods::{coefficient_intervals, BootstrapMethod, PercentileBootstrap};
pub use types::{ConfidenceInterval, ConfidenceLevel};
