//! Significance codes and permutation p-values

/// Significance code for a p-value
///
/// `***` below 0.001, `**` below 0.01, `*` below 0.05, `.` below 0.1.
pub fn sig_stars(p: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else if p < 0.1 {
        "."
    } else {
        ""
    }
}

/// Two-sided permutation p-value with the +1 correction
///
/// `(#{|T_perm| ≥ |T_obs|} + 1) / (P + 1)`, never zero.
pub fn permutation_p_value(null: &[f64], observed: f64) -> f64 {
    let threshold = observed.abs();
    let extreme = null.iter().filter(|t| t.abs() >= threshold).count();
    (extreme + 1) as f64 / (null.len() + 1) as f64
}
