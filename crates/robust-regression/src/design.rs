//! Design matrices and the per-row side information that travels with them

use nalgebra::{DMatrix, DVector};
use robust_core::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;

use crate::weights::Weights;

/// Name used for the constant column
pub const INTERCEPT: &str = "Intercept";

/// A numeric design matrix with its response and column names
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    names: Vec<String>,
    x: DMatrix<f64>,
    y: DVector<f64>,
    has_intercept: bool,
}

impl DesignMatrix {
    /// Wrap an already assembled matrix
    ///
    /// Rejects mismatched shapes, non-finite entries and designs without
    /// columns.
    pub fn new(
        names: Vec<String>,
        x: DMatrix<f64>,
        y: DVector<f64>,
        has_intercept: bool,
    ) -> Result<Self> {
        if x.ncols() == 0 {
            return Err(Error::InvalidInput(
                "design matrix has no columns".to_string(),
            ));
        }
        if names.len() != x.ncols() {
            return Err(Error::size_mismatch(x.ncols(), names.len(), "column names"));
        }
        if y.len() != x.nrows() {
            return Err(Error::size_mismatch(x.nrows(), y.len(), "response"));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("design matrix"));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("response"));
        }
        Ok(Self {
            names,
            x,
            y,
            has_intercept,
        })
    }

    /// Build from named predictor columns, optionally prepending an intercept
    pub fn from_columns(
        names: &[&str],
        columns: &[Vec<f64>],
        y: Vec<f64>,
        intercept: bool,
    ) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(Error::size_mismatch(columns.len(), names.len(), "column names"));
        }
        let n = y.len();
        if let Some(bad) = columns.iter().find(|c| c.len() != n) {
            return Err(Error::size_mismatch(n, bad.len(), "predictor column"));
        }

        let offset = usize::from(intercept);
        let p = columns.len() + offset;
        let x = DMatrix::from_fn(n, p, |i, j| {
            if j < offset {
                1.0
            } else {
                columns[j - offset][i]
            }
        });

        let mut all_names = Vec::with_capacity(p);
        if intercept {
            all_names.push(INTERCEPT.to_string());
        }
        all_names.extend(names.iter().map(|s| s.to_string()));

        Self::new(all_names, x, DVector::from_vec(y), intercept)
    }

    /// A single constant column, used for one-sample (second level) models
    pub fn intercept_only(y: &[f64]) -> Result<Self> {
        Self::from_columns(&[], &[], y.to_vec(), true)
    }

    /// Number of observations
    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    /// Number of coefficients
    pub fn n_coefs(&self) -> usize {
        self.x.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    pub fn has_intercept(&self) -> bool {
        self.has_intercept
    }

    /// Index of the constant column, if any
    pub fn intercept_index(&self) -> Option<usize> {
        if !self.has_intercept {
            return None;
        }
        self.names.iter().position(|n| n == INTERCEPT)
    }

    /// Copy of the design restricted to `rows` (repeats allowed)
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let p = self.x.ncols();
        Self {
            names: self.names.clone(),
            x: DMatrix::from_fn(rows.len(), p, |i, j| self.x[(rows[i], j)]),
            y: DVector::from_iterator(rows.len(), rows.iter().map(|&r| self.y[r])),
            has_intercept: self.has_intercept,
        }
    }

    /// Same predictors with a different response
    pub fn with_response(&self, y: DVector<f64>) -> Result<Self> {
        if y.len() != self.n_obs() {
            return Err(Error::size_mismatch(self.n_obs(), y.len(), "response"));
        }
        Ok(Self {
            names: self.names.clone(),
            x: self.x.clone(),
            y,
            has_intercept: self.has_intercept,
        })
    }
}

/// Map arbitrary labels to dense codes `0..k` in order of first appearance
///
/// ```rust
/// use robust_regression::encode_labels;
///
/// let (codes, levels) = encode_labels(&["b", "a", "b", "c"]);
/// assert_eq!(codes, vec![0, 1, 0, 2]);
/// assert_eq!(levels, vec!["b", "a", "c"]);
/// ```
pub fn encode_labels<T: Eq + Hash + Clone>(labels: &[T]) -> (Vec<usize>, Vec<T>) {
    let mut lookup: HashMap<&T, usize> = HashMap::new();
    let mut levels = Vec::new();
    let codes = labels
        .iter()
        .map(|label| {
            *lookup.entry(label).or_insert_with(|| {
                levels.push(label.clone());
                levels.len() - 1
            })
        })
        .collect();
    (codes, levels)
}

/// Row indices of each group, indexed by group code
pub(crate) fn group_rows(codes: &[usize]) -> Vec<Vec<usize>> {
    let n_groups = codes.iter().max().map_or(0, |&m| m + 1);
    let mut rows = vec![Vec::new(); n_groups];
    for (i, &g) in codes.iter().enumerate() {
        rows[g].push(i);
    }
    rows
}

/// Number of distinct groups in a dense code vector
pub(crate) fn count_groups(codes: &[usize]) -> usize {
    group_rows(codes).iter().filter(|rows| !rows.is_empty()).count()
}

/// A design matrix together with optional weights and cluster assignment
#[derive(Debug, Clone)]
pub struct RegressionData {
    pub design: DesignMatrix,
    pub weights: Option<Weights>,
    pub clusters: Option<Vec<usize>>,
}

impl RegressionData {
    pub fn new(design: DesignMatrix) -> Self {
        Self {
            design,
            weights: None,
            clusters: None,
        }
    }

    /// Attach observation weights
    pub fn with_weights(mut self, weights: Weights) -> Result<Self> {
        weights.check_len(self.design.n_obs())?;
        self.weights = Some(weights);
        Ok(self)
    }

    /// Attach a cluster code per row
    pub fn with_clusters(mut self, clusters: Vec<usize>) -> Result<Self> {
        if clusters.len() != self.design.n_obs() {
            return Err(Error::size_mismatch(
                self.design.n_obs(),
                clusters.len(),
                "cluster assignment",
            ));
        }
        self.clusters = Some(clusters);
        Ok(self)
    }

    /// Resample rows, carrying weights and clusters along
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            design: self.design.select_rows(rows),
            weights: self.weights.as_ref().map(|w| w.select_rows(rows)),
            clusters: self
                .clusters
                .as_ref()
                .map(|c| rows.iter().map(|&r| c[r]).collect()),
        }
    }
}
