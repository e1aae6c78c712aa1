//! Observation weights and the Welch-Satterthwaite degrees of freedom

use robust_core::{utils, Error, Result};
use tracing::debug;

use crate::design::group_rows;

/// How observation weights are obtained
#[derive(Debug, Clone, PartialEq)]
pub enum Weights {
    /// One non-negative weight per row
    Explicit(Vec<f64>),
    /// Group code per row; each row is weighted by `1 / var(y | group)`
    GroupVariance(Vec<usize>),
}

impl Weights {
    pub(crate) fn check_len(&self, n: usize) -> Result<()> {
        let len = match self {
            Weights::Explicit(w) => w.len(),
            Weights::GroupVariance(g) => g.len(),
        };
        if len != n {
            return Err(Error::size_mismatch(n, len, "weights"));
        }
        Ok(())
    }

    pub(crate) fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            Weights::Explicit(w) => Weights::Explicit(rows.iter().map(|&r| w[r]).collect()),
            Weights::GroupVariance(g) => {
                Weights::GroupVariance(rows.iter().map(|&r| g[r]).collect())
            }
        }
    }

    /// Concrete per-row weights for response `y`
    pub fn resolve(&self, y: &[f64]) -> Result<Vec<f64>> {
        self.check_len(y.len())?;
        match self {
            Weights::Explicit(w) => {
                if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(Error::InvalidInput(
                        "weights must be finite and non-negative".to_string(),
                    ));
                }
                Ok(w.clone())
            }
            Weights::GroupVariance(groups) => {
                let rows = group_rows(groups);
                let mut inverse = vec![0.0; rows.len()];
                for (g, members) in rows.iter().enumerate() {
                    if members.is_empty() {
                        continue;
                    }
                    let values: Vec<f64> = members.iter().map(|&i| y[i]).collect();
                    let var = utils::sample_variance(&values);
                    if !(var > 0.0) || !var.is_finite() {
                        return Err(Error::InvalidInput(format!(
                            "weight group {g} has {} observations and variance {var}; \
                             inverse-variance weights need positive variance",
                            members.len()
                        )));
                    }
                    inverse[g] = 1.0 / var;
                }
                debug!("resolved inverse-variance weights for {} groups", rows.len());
                Ok(groups.iter().map(|&g| inverse[g]).collect())
            }
        }
    }
}

/// Welch-Satterthwaite approximation for a two-group comparison
///
/// With `v_g = s_g² / n_g`:
/// `df = (Σ v_g)² / Σ (v_g² / (n_g - 1))`.
///
/// Returns `None` unless exactly two non-empty groups are present.
pub fn welch_satterthwaite(y: &[f64], groups: &[usize]) -> Result<Option<f64>> {
    if y.len() != groups.len() {
        return Err(Error::size_mismatch(y.len(), groups.len(), "group assignment"));
    }
    let rows: Vec<Vec<usize>> = group_rows(groups)
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();
    if rows.len() != 2 {
        return Ok(None);
    }

    let mut num = 0.0;
    let mut den = 0.0;
    for members in &rows {
        let n_g = members.len() as f64;
        if members.len() < 2 {
            return Err(Error::InsufficientData {
                expected: 2,
                actual: members.len(),
            });
        }
        let values: Vec<f64> = members.iter().map(|&i| y[i]).collect();
        let v = utils::sample_variance(&values) / n_g;
        num += v;
        den += v * v / (n_g - 1.0);
    }
    Ok(Some(num * num / den))
}

/// Number of distinct non-empty groups
pub fn group_count(groups: &[usize]) -> usize {
    crate::design::count_groups(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_explicit_weights_validated() {
        assert!(Weights::Explicit(vec![1.0, -1.0]).resolve(&[1.0, 2.0]).is_err());
        assert!(Weights::Explicit(vec![1.0]).resolve(&[1.0, 2.0]).is_err());
        let w = Weights::Explicit(vec![0.5, 2.0]).resolve(&[1.0, 2.0]).unwrap();
        assert_eq!(w, vec![0.5, 2.0]);
    }

    #[test]
    fn test_group_variance_weights() {
        // group 0 variance 1, group 1 variance 4
        let y = [1.0, 2.0, 3.0, 10.0, 12.0, 14.0];
        let groups = [0, 0, 0, 1, 1, 1];
        let w = Weights::GroupVariance(groups.to_vec()).resolve(&y).unwrap();
        assert_relative_eq!(w[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[4], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_group_variance_needs_spread() {
        let y = [1.0, 1.0, 3.0, 4.0];
        let result = Weights::GroupVariance(vec![0, 0, 1, 1]).resolve(&y);
        assert!(result.is_err());
    }

    #[test]
    fn test_welch_matches_manual() {
        let a = [4.1, 5.0, 6.2, 5.5, 4.8];
        let b = [7.0, 9.5, 8.1, 10.2, 6.6, 9.0, 8.8];
        let y: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
        let groups: Vec<usize> = std::iter::repeat(0)
            .take(a.len())
            .chain(std::iter::repeat(1).take(b.len()))
            .collect();

        let va = utils::sample_variance(&a) / 5.0;
        let vb = utils::sample_variance(&b) / 7.0;
        let expected = (va + vb).powi(2) / (va * va / 4.0 + vb * vb / 6.0);

        let df = welch_satterthwaite(&y, &groups).unwrap().unwrap();
        assert_relative_eq!(df, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_welch_requires_two_groups() {
        let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(welch_satterthwaite(&y, &[0, 0, 1, 1, 2, 2]).unwrap(), None);
        assert_eq!(group_count(&[0, 0, 1, 1, 2, 2]), 3);
    }
}
