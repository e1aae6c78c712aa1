//! Least-squares point estimation
//!
//! Weighted fits are ordinary fits on `√w · X` and `√w · y`; everything
//! downstream (covariance, leverage, residual variance) works on those
//! transformed "working" quantities.

use nalgebra::{DMatrix, DVector};
use robust_core::{Error, Result};

/// Relative pivot size below which `XᵀX` is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// A solved least-squares problem
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub coefficients: DVector<f64>,
    /// `(XᵀWX)⁻¹`
    pub bread: DMatrix<f64>,
    /// `√w · (y - Xb)`
    pub residuals: DVector<f64>,
    /// `√w · X`
    pub working_x: DMatrix<f64>,
}

impl LeastSquares {
    pub fn n_obs(&self) -> usize {
        self.working_x.nrows()
    }

    pub fn n_coefs(&self) -> usize {
        self.working_x.ncols()
    }

    /// Residual sum of squares on the working scale
    pub fn ssr(&self) -> f64 {
        self.residuals.dot(&self.residuals)
    }

    /// Diagonal of the hat matrix, `h_i = x_iᵀ (XᵀX)⁻¹ x_i`
    pub fn leverage(&self) -> DVector<f64> {
        let xb = &self.working_x * &self.bread;
        DVector::from_iterator(
            self.n_obs(),
            (0..self.n_obs()).map(|i| xb.row(i).dot(&self.working_x.row(i))),
        )
    }
}

/// Solve `b = (XᵀWX)⁻¹ XᵀWy`
///
/// Fails with [`Error::Singular`] when the normal equations are not
/// positive definite, i.e. the design is rank deficient.
pub fn least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: Option<&[f64]>,
) -> Result<LeastSquares> {
    let (n, p) = x.shape();
    if y.len() != n {
        return Err(Error::size_mismatch(n, y.len(), "response"));
    }
    if n < p {
        return Err(Error::InsufficientData {
            expected: p,
            actual: n,
        });
    }

    let (working_x, working_y) = match weights {
        Some(w) => {
            if w.len() != n {
                return Err(Error::size_mismatch(n, w.len(), "weights"));
            }
            let root: Vec<f64> = w.iter().map(|v| v.sqrt()).collect();
            (
                DMatrix::from_fn(n, p, |i, j| x[(i, j)] * root[i]),
                DVector::from_iterator(n, y.iter().zip(&root).map(|(v, r)| v * r)),
            )
        }
        None => (x.clone(), y.clone()),
    };

    let xtx = working_x.transpose() * &working_x;
    let bread = invert_normal_equations(&xtx)?;
    let xty = working_x.transpose() * &working_y;
    let coefficients = &bread * xty;
    let residuals = &working_y - &working_x * &coefficients;

    Ok(LeastSquares {
        coefficients,
        bread,
        residuals,
        working_x,
    })
}

fn invert_normal_equations(xtx: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let chol = xtx
        .clone()
        .cholesky()
        .ok_or_else(|| Error::Singular("XᵀX is not positive definite".to_string()))?;

    let l = chol.l();
    for i in 0..xtx.nrows() {
        let pivot = l[(i, i)] * l[(i, i)];
        if !(pivot > SINGULAR_TOLERANCE * xtx[(i, i)]) {
            return Err(Error::Singular(format!(
                "design column {i} is (nearly) collinear with the preceding columns"
            )));
        }
    }
    Ok(chol.inverse())
}
