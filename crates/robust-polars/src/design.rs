//! Turning a `DataFrame` and a [`Formula`] into a numeric design matrix

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use robust_core::utils;
use robust_regression::{encode_labels, DesignMatrix, INTERCEPT};
use tracing::debug;

use crate::formula::{Factor, Formula, Term};
use crate::{Error, Result};

/// How a factor is turned into design columns
#[derive(Debug, Clone, PartialEq)]
pub enum Coding {
    /// The values themselves
    Numeric,
    /// Treatment contrasts against the first level
    Categorical(Vec<String>),
}

/// What the builder learned from the data, enough to rebuild predictors
#[derive(Debug, Clone)]
pub struct DesignInfo {
    formula: Formula,
    codings: HashMap<String, Coding>,
    names: Vec<String>,
    ranked: bool,
}

impl DesignInfo {
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Design column names, intercept first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Coding of a factor by its label (`x` or `C(x)`)
    pub fn coding(&self, label: &str) -> Option<&Coding> {
        self.codings.get(label)
    }

    pub fn is_ranked(&self) -> bool {
        self.ranked
    }

    /// Predictor matrix for new rows, coded the way the fitted data was
    pub fn predictors(&self, df: &DataFrame) -> Result<DMatrix<f64>> {
        if self.is_ranked() {
            return Err(Error::InvalidParameter(
                "cannot predict from a rank regression".to_string(),
            ));
        }
        let mut values = HashMap::new();
        for factor in unique_factors(&self.formula) {
            let label = factor.label();
            let coding = self
                .coding(&label)
                .ok_or_else(|| Error::InvalidColumn(label.clone()))?;
            let raw = match coding {
                Coding::Numeric => Values::Numeric(read_numeric(df, &factor.column)?),
                Coding::Categorical(_) => Values::Labels(read_labels(df, &factor.column)?),
            };
            if (0..df.height()).any(|i| raw.is_null(i)) {
                return Err(Error::InvalidInput(format!(
                    "column '{}' contains nulls",
                    factor.column
                )));
            }
            values.insert(label, raw.complete(&(0..df.height()).collect::<Vec<_>>()));
        }
        let (names, x) = assemble(&self.formula, &self.codings, &values, df.height())?;
        if names != self.names {
            return Err(Error::InvalidInput(format!(
                "new data produce columns {names:?}, expected {:?}",
                self.names
            )));
        }
        Ok(x)
    }
}

/// Output of [`DesignBuilder::build`]
#[derive(Debug, Clone)]
pub struct BuiltDesign {
    pub design: DesignMatrix,
    pub info: DesignInfo,
    /// Input row index of every design row
    pub rows: Vec<usize>,
    labels: HashMap<String, Vec<String>>,
}

impl BuiltDesign {
    /// Values of an auxiliary column, aligned with the design rows
    pub fn labels(&self, column: &str) -> Result<&[String]> {
        self.labels
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::InvalidColumn(column.to_string()))
    }

    /// Integer codes (first-appearance order) and level names of an auxiliary column
    pub fn codes(&self, column: &str) -> Result<(Vec<usize>, Vec<String>)> {
        Ok(encode_labels(self.labels(column)?))
    }

    /// Pick entries of a per-input-row vector for the design rows
    pub fn align<T: Clone>(&self, values: &[T]) -> Result<Vec<T>> {
        if let Some(&max) = self.rows.iter().max() {
            if max >= values.len() {
                return Err(Error::InvalidInput(format!(
                    "expected one value per data row, got {}",
                    values.len()
                )));
            }
        }
        Ok(self.rows.iter().map(|&r| values[r].clone()).collect())
    }
}

/// Builds a [`DesignMatrix`] from a formula over a `DataFrame`
///
/// Rows with a null in the response, any predictor or any auxiliary
/// column are dropped before coding.
#[derive(Debug, Clone)]
pub struct DesignBuilder<'a> {
    formula: &'a Formula,
    rank: bool,
    rank_within: Option<&'a str>,
    auxiliary: Vec<&'a str>,
}

impl<'a> DesignBuilder<'a> {
    pub fn new(formula: &'a Formula) -> Self {
        Self {
            formula,
            rank: false,
            rank_within: None,
            auxiliary: Vec::new(),
        }
    }

    /// Replace numeric columns with average ranks
    pub fn rank(mut self, rank: bool) -> Self {
        self.rank = rank;
        self
    }

    /// Rank separately inside each level of `column`
    pub fn rank_within(mut self, column: &'a str) -> Self {
        self.rank_within = Some(column);
        self.with_auxiliary(column)
    }

    /// Carry `column` along as labels, dropping rows where it is null
    pub fn with_auxiliary(mut self, column: &'a str) -> Self {
        if !self.auxiliary.contains(&column) {
            self.auxiliary.push(column);
        }
        self
    }

    pub fn build(&self, df: &DataFrame) -> Result<BuiltDesign> {
        let response = read_numeric(df, self.formula.response())?;
        let factors = unique_factors(self.formula);
        let raw: Vec<(String, Values)> = factors
            .iter()
            .map(|f| Ok((f.label(), read_factor(df, f)?)))
            .collect::<Result<_>>()?;
        let auxiliary: Vec<(&str, Vec<Option<String>>)> = self
            .auxiliary
            .iter()
            .map(|&c| Ok((c, read_labels(df, c)?)))
            .collect::<Result<_>>()?;

        let rows: Vec<usize> = (0..df.height())
            .filter(|&i| {
                response[i].is_some()
                    && raw.iter().all(|(_, v)| !v.is_null(i))
                    && auxiliary.iter().all(|(_, v)| v[i].is_some())
            })
            .collect();
        if rows.is_empty() {
            return Err(Error::InvalidInput(
                "no rows without missing values".to_string(),
            ));
        }
        if rows.len() < df.height() {
            debug!("Dropped {} rows with missing values", df.height() - rows.len());
        }

        let labels: HashMap<String, Vec<String>> = auxiliary
            .into_iter()
            .map(|(c, v)| (c.to_string(), rows.iter().filter_map(|&i| v[i].clone()).collect()))
            .collect();

        let rank_groups = match self.rank_within {
            Some(column) if self.rank => labels.get(column).map(|l| encode_labels(l).0),
            _ => None,
        };
        let ranked = |values: Vec<f64>| -> Vec<f64> {
            if !self.rank {
                return values;
            }
            match &rank_groups {
                Some(groups) => rank_within_groups(&values, groups),
                None => utils::rank_average(&values),
            }
        };

        let y = ranked(rows.iter().filter_map(|&i| response[i]).collect());

        let mut codings = HashMap::new();
        let mut values = HashMap::new();
        for (label, raw_values) in raw {
            let complete = match raw_values.complete(&rows) {
                Complete::Numeric(v) => Complete::Numeric(ranked(v)),
                labels => labels,
            };
            let coding = match &complete {
                Complete::Numeric(_) => Coding::Numeric,
                Complete::Labels(v) => Coding::Categorical(sorted_levels(v)),
            };
            codings.insert(label.clone(), coding);
            values.insert(label, complete);
        }

        let (names, x) = assemble(self.formula, &codings, &values, rows.len())?;
        debug!("Built design with {} rows and columns {:?}", rows.len(), names);
        let design = DesignMatrix::new(
            names.clone(),
            x,
            DVector::from_vec(y),
            self.formula.has_intercept(),
        )?;

        Ok(BuiltDesign {
            design,
            info: DesignInfo {
                formula: self.formula.clone(),
                codings,
                names,
                ranked: self.rank,
            },
            rows,
            labels,
        })
    }
}

/// Raw column values, nulls included
enum Values {
    Numeric(Vec<Option<f64>>),
    Labels(Vec<Option<String>>),
}

impl Values {
    fn is_null(&self, i: usize) -> bool {
        match self {
            Values::Numeric(v) => v[i].is_none(),
            Values::Labels(v) => v[i].is_none(),
        }
    }

    fn complete(&self, rows: &[usize]) -> Complete {
        match self {
            Values::Numeric(v) => Complete::Numeric(rows.iter().filter_map(|&i| v[i]).collect()),
            Values::Labels(v) => {
                Complete::Labels(rows.iter().filter_map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// Column values restricted to complete rows
enum Complete {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
    )
}

fn is_label(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(..) | DataType::Enum(..)
    )
}

fn get_column<'df>(df: &'df DataFrame, name: &str) -> Result<&'df Column> {
    df.column(name)
        .map_err(|_| Error::InvalidColumn(format!("column '{name}' not found")))
}

fn read_numeric(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = get_column(df, name)?;
    if !is_numeric(column.dtype()) {
        return Err(Error::TypeMismatch {
            expected: format!("numeric column '{name}'"),
            got: column.dtype().to_string(),
        });
    }
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}

fn read_labels(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = get_column(df, name)?;
    let cast = column.cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn read_factor(df: &DataFrame, factor: &Factor) -> Result<Values> {
    if factor.forced_categorical {
        return Ok(Values::Labels(read_labels(df, &factor.column)?));
    }
    let dtype = get_column(df, &factor.column)?.dtype().clone();
    if is_numeric(&dtype) {
        Ok(Values::Numeric(read_numeric(df, &factor.column)?))
    } else if is_label(&dtype) {
        Ok(Values::Labels(read_labels(df, &factor.column)?))
    } else {
        Err(Error::TypeMismatch {
            expected: format!("numeric or categorical column '{}'", factor.column),
            got: dtype.to_string(),
        })
    }
}

fn unique_factors(formula: &Formula) -> Vec<Factor> {
    let mut out: Vec<Factor> = Vec::new();
    for factor in formula.terms().iter().flat_map(|t| &t.factors) {
        if !out.contains(factor) {
            out.push(factor.clone());
        }
    }
    out
}

/// Distinct levels, numerically ordered when every level parses as a number
fn sorted_levels(labels: &[String]) -> Vec<String> {
    let mut levels: Vec<String> = labels.to_vec();
    levels.sort();
    levels.dedup();
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if let Some(keys) = numeric {
        let mut paired: Vec<(f64, String)> = keys.into_iter().zip(levels).collect();
        paired.sort_by(|a, b| a.0.total_cmp(&b.0));
        levels = paired.into_iter().map(|(_, l)| l).collect();
    }
    levels
}

fn rank_within_groups(values: &[f64], groups: &[usize]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    let n_groups = groups.iter().max().map_or(0, |m| m + 1);
    for g in 0..n_groups {
        let members: Vec<usize> = (0..values.len()).filter(|&i| groups[i] == g).collect();
        let subset: Vec<f64> = members.iter().map(|&i| values[i]).collect();
        for (&i, r) in members.iter().zip(utils::rank_average(&subset)) {
            out[i] = r;
        }
    }
    out
}

fn factor_columns(label: &str, coding: &Coding, values: &Complete) -> Result<Vec<(String, Vec<f64>)>> {
    match (coding, values) {
        (Coding::Numeric, Complete::Numeric(v)) => Ok(vec![(label.to_string(), v.clone())]),
        (Coding::Categorical(levels), Complete::Labels(v)) => {
            if let Some(unknown) = v.iter().find(|l| !levels.contains(l)) {
                return Err(Error::InvalidInput(format!(
                    "level '{unknown}' of '{label}' was not seen when fitting"
                )));
            }
            Ok(levels
                .iter()
                .skip(1)
                .map(|level| {
                    let indicator = v.iter().map(|l| f64::from(u8::from(l == level))).collect();
                    (format!("{label}[T.{level}]"), indicator)
                })
                .collect())
        }
        (Coding::Numeric, Complete::Labels(_)) => Err(Error::TypeMismatch {
            expected: format!("numeric values for '{label}'"),
            got: "labels".to_string(),
        }),
        (Coding::Categorical(_), Complete::Numeric(_)) => Err(Error::TypeMismatch {
            expected: format!("labels for '{label}'"),
            got: "numeric values".to_string(),
        }),
    }
}

fn term_columns(
    term: &Term,
    codings: &HashMap<String, Coding>,
    values: &HashMap<String, Complete>,
    n: usize,
) -> Result<Vec<(String, Vec<f64>)>> {
    let mut combos: Vec<(String, Vec<f64>)> = vec![(String::new(), vec![1.0; n])];
    for factor in &term.factors {
        let label = factor.label();
        let (coding, data) = codings
            .get(&label)
            .zip(values.get(&label))
            .ok_or_else(|| Error::InvalidColumn(label.clone()))?;
        let columns = factor_columns(&label, coding, data)?;
        combos = combos
            .iter()
            .flat_map(|(prefix, base)| {
                columns.iter().map(move |(name, col)| {
                    let joined = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}:{name}")
                    };
                    (joined, base.iter().zip(col).map(|(a, b)| a * b).collect())
                })
            })
            .collect();
    }
    Ok(combos)
}

fn assemble(
    formula: &Formula,
    codings: &HashMap<String, Coding>,
    values: &HashMap<String, Complete>,
    n: usize,
) -> Result<(Vec<String>, DMatrix<f64>)> {
    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
    if formula.has_intercept() {
        columns.push((INTERCEPT.to_string(), vec![1.0; n]));
    }
    for term in formula.terms() {
        columns.extend(term_columns(term, codings, values, n)?);
    }
    if columns.is_empty() {
        return Err(Error::Formula(format!(
            "'{formula}' produces an empty design"
        )));
    }
    let x = DMatrix::from_fn(n, columns.len(), |i, j| columns[j].1[i]);
    let names = columns.into_iter().map(|(name, _)| name).collect();
    Ok((names, x))
}
