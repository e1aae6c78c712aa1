//! Model formulas: `response ~ term + term ...`
//!
//! Supported syntax:
//!
//! - column names, `C(col)` to force categorical coding
//! - `a:b` interactions and `a*b` (expands to `a + b + a:b`)
//! - `1` keeps the intercept, `0` or `-1` removes it

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{Error, Result};

/// One variable inside a term
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Factor {
    /// Column name in the data
    pub column: String,
    /// Coded with treatment contrasts regardless of the column type
    pub forced_categorical: bool,
}

impl Factor {
    /// Label used in coefficient names, e.g. `x` or `C(x)`
    pub fn label(&self) -> String {
        if self.forced_categorical {
            format!("C({})", self.column)
        } else {
            self.column.clone()
        }
    }
}

/// A main effect or interaction
///
/// Factors keep their written order for naming; `a:b` and `b:a` compare
/// equal.
#[derive(Debug, Clone)]
pub struct Term {
    pub factors: Vec<Factor>,
}

impl Term {
    pub fn degree(&self) -> usize {
        self.factors.len()
    }

    fn factor_set(&self) -> Vec<&Factor> {
        let mut set: Vec<&Factor> = self.factors.iter().collect();
        set.sort();
        set
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.factor_set() == other.factor_set()
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.factor_set().hash(state);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.factors.iter().map(Factor::label).collect();
        f.write_str(&labels.join(":"))
    }
}

/// A parsed model formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    response: String,
    terms: Vec<Term>,
    intercept: bool,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self> {
        let mut sides = source.split('~');
        let (lhs, rhs) = match (sides.next(), sides.next(), sides.next()) {
            (Some(lhs), Some(rhs), None) => (lhs.trim(), rhs.trim()),
            _ => {
                return Err(Error::Formula(format!(
                    "expected exactly one '~' in '{source}'"
                )))
            }
        };
        if !is_identifier(lhs) {
            return Err(Error::Formula(format!("invalid response '{lhs}'")));
        }
        if rhs.is_empty() {
            return Err(Error::Formula("empty right-hand side".to_string()));
        }

        let mut intercept = true;
        let mut terms: Vec<Term> = Vec::new();
        for (negated, token) in split_terms(rhs)? {
            match (negated, token.as_str()) {
                (false, "1") => intercept = true,
                (false, "0") | (true, "1") => intercept = false,
                (true, _) => {
                    return Err(Error::Formula(format!(
                        "only '-1' may be subtracted, got '-{token}'"
                    )))
                }
                (false, _) => {
                    for term in expand(&token)? {
                        if !terms.contains(&term) {
                            terms.push(term);
                        }
                    }
                }
            }
        }
        // main effects first, then interactions by degree
        terms.sort_by_key(Term::degree);

        Ok(Self {
            source: source.trim().to_string(),
            response: lhs.to_string(),
            terms,
            intercept,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept
    }

    /// Distinct data columns referenced on the right-hand side
    pub fn predictor_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for factor in self.terms.iter().flat_map(|t| &t.factors) {
            if !out.contains(&factor.column.as_str()) {
                out.push(&factor.column);
            }
        }
        out
    }

    /// Whether `column` appears inside `C(...)` anywhere
    pub fn is_forced_categorical(&self, column: &str) -> bool {
        self.terms
            .iter()
            .flat_map(|t| &t.factors)
            .any(|f| f.column == column && f.forced_categorical)
    }
}

impl FromStr for Formula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split on top-level `+` / `-`, keeping track of subtraction
fn split_terms(rhs: &str) -> Result<Vec<(bool, String)>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut negated = false;

    for ch in rhs.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::Formula(format!("unbalanced ')' in '{rhs}'")))?;
                current.push(ch);
            }
            '+' | '-' if depth == 0 => {
                // a leading '-' has nothing to flush
                if !(current.trim().is_empty() && ch == '-' && out.is_empty()) {
                    flush(&mut out, &mut current, negated, rhs)?;
                }
                negated = ch == '-';
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(Error::Formula(format!("unbalanced '(' in '{rhs}'")));
    }
    flush(&mut out, &mut current, negated, rhs)?;
    Ok(out)
}

fn flush(
    out: &mut Vec<(bool, String)>,
    current: &mut String,
    negated: bool,
    rhs: &str,
) -> Result<()> {
    let token = current.trim().to_string();
    current.clear();
    if token.is_empty() {
        return Err(Error::Formula(format!("empty term in '{rhs}'")));
    }
    out.push((negated, token));
    Ok(())
}

/// Expand `a*b` and `a:b` into terms
fn expand(token: &str) -> Result<Vec<Term>> {
    let starred: Vec<&str> = token.split('*').map(str::trim).collect();
    let groups = starred
        .iter()
        .map(|part| {
            part.split(':')
                .map(|name| parse_factor(name.trim()))
                .collect::<Result<Vec<Factor>>>()
        })
        .collect::<Result<Vec<Vec<Factor>>>>()?;

    // every non-empty subset of the starred parts, in subset-size order
    let k = groups.len();
    let mut subsets: Vec<Vec<usize>> = (1..(1usize << k))
        .map(|mask| (0..k).filter(|i| mask & (1 << i) != 0).collect())
        .collect();
    subsets.sort_by_key(|s| s.len());

    Ok(subsets
        .into_iter()
        .map(|subset| {
            let mut factors: Vec<Factor> = Vec::new();
            for i in subset {
                for factor in &groups[i] {
                    if !factors.contains(factor) {
                        factors.push(factor.clone());
                    }
                }
            }
            Term { factors }
        })
        .collect())
}

fn parse_factor(text: &str) -> Result<Factor> {
    if let Some(inner) = text.strip_prefix("C(").and_then(|t| t.strip_suffix(')')) {
        let inner = inner.trim();
        if !is_identifier(inner) {
            return Err(Error::Formula(format!("invalid column in '{text}'")));
        }
        return Ok(Factor {
            column: inner.to_string(),
            forced_categorical: true,
        });
    }
    if !is_identifier(text) {
        return Err(Error::Formula(format!("invalid term '{text}'")));
    }
    Ok(Factor {
        column: text.to_string(),
        forced_categorical: false,
    })
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !s.chars().all(|c| c.is_ascii_digit())
}
