//! Semi-partial and partial correlations of design columns with the response

use nalgebra::{DMatrix, DVector};
use robust_core::Result;

use crate::design::DesignMatrix;
use crate::estimator::least_squares;
use crate::options::CorrelationType;
use crate::stats::pearson;

/// Correlation of each non-intercept column with the response
///
/// Each predictor is residualised on every other column (intercept
/// included). Semi-partial correlations pair that residual with the raw
/// response; partial correlations pair it with the response residualised
/// on the same columns. Results are ordered like the non-intercept columns.
pub fn predictor_correlations(design: &DesignMatrix, kind: CorrelationType) -> Result<Vec<f64>> {
    let x = design.x();
    let y = design.y();
    let p = design.n_coefs();
    let intercept = design.intercept_index();

    let mut out = Vec::with_capacity(p);
    for j in (0..p).filter(|&j| Some(j) != intercept) {
        let target = x.column(j).into_owned();
        let others: Vec<usize> = (0..p).filter(|&k| k != j).collect();

        let pred_resid = residualise(x, &others, &target)?;
        let r = match kind {
            CorrelationType::Semi => pearson(pred_resid.as_slice(), y.as_slice()),
            CorrelationType::Partial => {
                let dv_resid = residualise(x, &others, y)?;
                pearson(pred_resid.as_slice(), dv_resid.as_slice())
            }
        };
        out.push(r);
    }
    Ok(out)
}

/// Fisher z-transform, `atanh(r)`
pub fn fisher_z(r: f64) -> f64 {
    r.atanh()
}

fn residualise(x: &DMatrix<f64>, columns: &[usize], target: &DVector<f64>) -> Result<DVector<f64>> {
    if columns.is_empty() {
        return Ok(target.clone());
    }
    let sub = x.select_columns(columns);
    Ok(least_squares(&sub, target, None)?.residuals)
}
