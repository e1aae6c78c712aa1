//! Coefficient tables
//!
//! A table's column set depends on how inference was done, so the mode is
//! carried as a tagged [`Inference`] value alongside the shared columns.

use robust_confidence::ConfidenceInterval;
use robust_core::{Error, Result};
use serde::Serialize;
use std::fmt;

use crate::inference::sig_stars;

pub const ESTIMATE: &str = "Estimate";
pub const CI_LOWER: &str = "2.5_ci";
pub const CI_UPPER: &str = "97.5_ci";
pub const SE: &str = "SE";
pub const DF: &str = "DF";
pub const NUM_PERM: &str = "Num_perm";
pub const T_STAT: &str = "T-stat";
pub const P_VAL: &str = "P-val";
pub const PERM_P_VAL: &str = "Perm-P-val";
pub const SIG: &str = "Sig";

const PARAMETRIC_COLUMNS: [&str; 8] = [ESTIMATE, CI_LOWER, CI_UPPER, SE, DF, T_STAT, P_VAL, SIG];
const PERMUTATION_COLUMNS: [&str; 8] = [
    ESTIMATE, CI_LOWER, CI_UPPER, SE, NUM_PERM, T_STAT, PERM_P_VAL, SIG,
];
const BOOTSTRAP_COLUMNS: [&str; 6] = [ESTIMATE, CI_LOWER, CI_UPPER, SE, T_STAT, SIG];

/// How p-values (or their absence) were obtained
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Inference {
    /// t-distribution p-values with per-coefficient degrees of freedom
    Parametric { df: Vec<f64>, p_values: Vec<f64> },
    /// Permutation p-values
    Permutation { n_perm: usize, p_values: Vec<f64> },
    /// Bootstrap intervals only; significance means the interval excludes 0
    Bootstrapped { n_boot: usize },
}

/// Estimates and their uncertainty, one row per coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientTable {
    names: Vec<String>,
    estimates: Vec<f64>,
    ci_lower: Vec<f64>,
    ci_upper: Vec<f64>,
    std_errors: Vec<f64>,
    t_stats: Vec<f64>,
    sig: Vec<String>,
    inference: Inference,
}

/// One row of a [`CoefficientTable`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientRow<'a> {
    pub name: &'a str,
    pub estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub std_error: f64,
    pub t_stat: f64,
    /// Parametric or permutation p-value
    pub p_value: Option<f64>,
    pub sig: &'a str,
}

impl CoefficientTable {
    /// Assemble a table
    ///
    /// Significance codes come from the p-values, or from whether each
    /// interval excludes zero for bootstrapped tables.
    pub fn new(
        names: Vec<String>,
        estimates: Vec<f64>,
        intervals: &[ConfidenceInterval],
        std_errors: Vec<f64>,
        t_stats: Vec<f64>,
        inference: Inference,
    ) -> Result<Self> {
        let n = names.len();
        let check = |len: usize, what: &str| {
            if len == n {
                Ok(())
            } else {
                Err(Error::size_mismatch(n, len, what))
            }
        };
        check(estimates.len(), "estimates")?;
        check(intervals.len(), "confidence intervals")?;
        check(std_errors.len(), "standard errors")?;
        check(t_stats.len(), "t statistics")?;

        let sig = match &inference {
            Inference::Parametric { df, p_values } => {
                check(df.len(), "degrees of freedom")?;
                check(p_values.len(), "p-values")?;
                p_values.iter().map(|&p| sig_stars(p).to_string()).collect()
            }
            Inference::Permutation { p_values, .. } => {
                check(p_values.len(), "p-values")?;
                p_values.iter().map(|&p| sig_stars(p).to_string()).collect()
            }
            Inference::Bootstrapped { .. } => intervals
                .iter()
                .map(|ci| if ci.excludes(0.0) { "*" } else { "" }.to_string())
                .collect(),
        };

        Ok(Self {
            names,
            estimates,
            ci_lower: intervals.iter().map(|ci| ci.lower).collect(),
            ci_upper: intervals.iter().map(|ci| ci.upper).collect(),
            std_errors,
            t_stats,
            sig,
            inference,
        })
    }

    /// Column names, in display order
    pub fn columns(&self) -> &'static [&'static str] {
        match self.inference {
            Inference::Parametric { .. } => &PARAMETRIC_COLUMNS,
            Inference::Permutation { .. } => &PERMUTATION_COLUMNS,
            Inference::Bootstrapped { .. } => &BOOTSTRAP_COLUMNS,
        }
    }

    pub fn inference(&self) -> &Inference {
        &self.inference
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    pub fn std_errors(&self) -> &[f64] {
        &self.std_errors
    }

    pub fn t_stats(&self) -> &[f64] {
        &self.t_stats
    }

    pub fn sig(&self) -> &[String] {
        &self.sig
    }

    /// Parametric or permutation p-values
    pub fn p_values(&self) -> Option<&[f64]> {
        match &self.inference {
            Inference::Parametric { p_values, .. } | Inference::Permutation { p_values, .. } => {
                Some(p_values)
            }
            Inference::Bootstrapped { .. } => None,
        }
    }

    pub fn row(&self, i: usize) -> Option<CoefficientRow<'_>> {
        if i >= self.len() {
            return None;
        }
        Some(CoefficientRow {
            name: &self.names[i],
            estimate: self.estimates[i],
            ci_lower: self.ci_lower[i],
            ci_upper: self.ci_upper[i],
            std_error: self.std_errors[i],
            t_stat: self.t_stats[i],
            p_value: self.p_values().map(|p| p[i]),
            sig: &self.sig[i],
        })
    }

    /// Row for a coefficient by name
    pub fn get(&self, name: &str) -> Option<CoefficientRow<'_>> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.row(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = CoefficientRow<'_>> {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    /// Values of a numeric column; `None` for `Sig` or a column this table lacks
    pub fn numeric_column(&self, column: &str) -> Option<Vec<f64>> {
        if !self.columns().contains(&column) {
            return None;
        }
        match column {
            ESTIMATE => Some(self.estimates.clone()),
            CI_LOWER => Some(self.ci_lower.clone()),
            CI_UPPER => Some(self.ci_upper.clone()),
            SE => Some(self.std_errors.clone()),
            T_STAT => Some(self.t_stats.clone()),
            DF => match &self.inference {
                Inference::Parametric { df, .. } => Some(df.clone()),
                _ => None,
            },
            NUM_PERM => match &self.inference {
                Inference::Permutation { n_perm, .. } => Some(vec![*n_perm as f64; self.len()]),
                _ => None,
            },
            P_VAL | PERM_P_VAL => self.p_values().map(|p| p.to_vec()),
            _ => None,
        }
    }
}

impl fmt::Display for CoefficientTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.names.iter().map(|n| n.len()).max().unwrap_or(0).max(4);
        write!(f, "{:<width$}", "")?;
        for col in self.columns() {
            write!(f, " {:>10}", col)?;
        }
        writeln!(f)?;

        for i in 0..self.len() {
            write!(f, "{:<width$}", self.names[i])?;
            for col in self.columns() {
                if *col == SIG {
                    write!(f, " {:>10}", self.sig[i])?;
                } else if *col == NUM_PERM {
                    if let Inference::Permutation { n_perm, .. } = self.inference {
                        write!(f, " {:>10}", n_perm)?;
                    }
                } else if let Some(values) = self.numeric_column(col) {
                    write!(f, " {:>10.3}", values[i])?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
