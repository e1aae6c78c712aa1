//! Asymptotic confidence intervals based on the Student-t distribution

use crate::{ConfidenceInterval, ConfidenceLevel};
use robust_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Student-t interval estimator
///
/// Builds `estimate ± t(1 - α/2, df) · se` intervals and the matching
/// two-sided p-values. Degrees of freedom may be fractional (e.g. from a
/// Welch-Satterthwaite approximation).
#[derive(Debug, Clone, Copy)]
pub struct StudentsTInterval {
    confidence_level: ConfidenceLevel,
}

impl StudentsTInterval {
    /// Create a new Student-t interval estimator
    pub fn new(confidence_level: ConfidenceLevel) -> Self {
        Self { confidence_level }
    }

    /// Get the confidence level
    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    /// Critical value `t(1 - α/2, df)`
    pub fn critical_value(&self, df: f64) -> Result<f64> {
        let t_dist = students_t(df)?;
        Ok(t_dist.inverse_cdf(1.0 - self.confidence_level.tail_probability()))
    }

    /// Interval for a single estimate
    pub fn interval(&self, estimate: f64, std_error: f64, df: f64) -> Result<ConfidenceInterval> {
        let margin = self.critical_value(df)? * std_error;
        Ok(ConfidenceInterval::new(
            estimate - margin,
            estimate + margin,
            estimate,
            self.confidence_level.value(),
        ))
    }
}

impl Default for StudentsTInterval {
    fn default() -> Self {
        Self::new(ConfidenceLevel::NINETY_FIVE)
    }
}

/// Two-sided p-value of a t statistic
pub fn two_sided_p_value(t: f64, df: f64) -> Result<f64> {
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    let t_dist = students_t(df)?;
    let p = 2.0 * (1.0 - t_dist.cdf(t.abs()));
    Ok(p.clamp(0.0, 1.0))
}

fn students_t(df: f64) -> Result<StudentsT> {
    if !(df > 0.0) {
        return Err(Error::InvalidInput(format!(
            "Degrees of freedom must be positive, got {df}"
        )));
    }
    StudentsT::new(0.0, 1.0, df)
        .map_err(|e| Error::Computation(format!("Failed to create t-distribution: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_critical_value_matches_tables() {
        let ci = StudentsTInterval::default();
        assert_relative_eq!(ci.critical_value(10.0).unwrap(), 2.228138852, epsilon = 1e-6);
        assert_relative_eq!(ci.critical_value(1000.0).unwrap(), 1.962339, epsilon = 1e-5);
    }

    #[test]
    fn test_interval_is_symmetric() {
        let ci = StudentsTInterval::default().interval(3.0, 0.5, 20.0).unwrap();
        assert_relative_eq!(ci.estimate - ci.lower, ci.upper - ci.estimate, epsilon = 1e-12);
        assert!(ci.contains(3.0));
    }

    #[test]
    fn test_two_sided_p_value() {
        assert_relative_eq!(two_sided_p_value(0.0, 5.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(two_sided_p_value(2.228138852, 10.0).unwrap(), 0.05, epsilon = 1e-6);
        assert_relative_eq!(
            two_sided_p_value(-2.228138852, 10.0).unwrap(),
            two_sided_p_value(2.228138852, 10.0).unwrap()
        );
    }

    #[test]
    fn test_invalid_df() {
        assert!(two_sided_p_value(1.0, 0.0).is_err());
        assert!(StudentsTInterval::default().interval(1.0, 1.0, -3.0).is_err());
    }
}
