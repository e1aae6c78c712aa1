//! Conversion of coefficient tables into `DataFrame`s

use polars::prelude::*;
use robust_regression::table::{NUM_PERM, SIG};
use robust_regression::{CoefficientTable, Inference};

use crate::Result;

/// Name of the coefficient-name column
pub const TERM: &str = "term";

/// One row per coefficient: `term` followed by the table's columns in order
pub fn table_to_frame(table: &CoefficientTable) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(table.columns().len() + 1);
    columns.push(Series::new(TERM.into(), table.names().to_vec()).into());

    for &name in table.columns() {
        let column: Column = match name {
            SIG => Series::new(name.into(), table.sig().to_vec()).into(),
            NUM_PERM => {
                let n_perm = match table.inference() {
                    Inference::Permutation { n_perm, .. } => *n_perm as u64,
                    _ => 0,
                };
                Series::new(name.into(), vec![n_perm; table.len()]).into()
            }
            _ => {
                let values = table.numeric_column(name).unwrap_or_default();
                Series::new(name.into(), values).into()
            }
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

/// Wide frame of per-group estimates, group labels in the first column
pub fn first_level_to_frame(
    group_column: &str,
    groups: &[String],
    names: &[String],
    estimates: &[Vec<f64>],
) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(names.len() + 1);
    columns.push(Series::new(group_column.into(), groups.to_vec()).into());
    for (j, name) in names.iter().enumerate() {
        let values: Vec<f64> = estimates.iter().map(|row| row[j]).collect();
        columns.push(Series::new(name.as_str().into(), values).into());
    }
    Ok(DataFrame::new(columns)?)
}
