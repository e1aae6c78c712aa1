//! Error types for robust regression
//!
//! Provides a unified error type for all robust-lm crates.

use thiserror::Error;

/// Core error type for regression and resampling operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value (unknown estimator, family, CI mode, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The normal equations have no unique solution
    #[error("Numerical degeneracy: {0}")]
    Singular(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Threading or parallelization error
    #[error("Execution error: {0}")]
    Execution(String),

    /// Feature not available
    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::InvalidInput(format!("{context} contains NaN or infinite values"))
    }

    /// Create an error for an unrecognised option value
    pub fn unknown_option(option: &str, value: &str, expected: &[&str]) -> Self {
        Self::InvalidParameter(format!(
            "{option} must be one of: {}; got '{value}'",
            expected.join(", ")
        ))
    }
}
