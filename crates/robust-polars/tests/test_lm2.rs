//! Tests for two-stage `Lm2` fits

mod common;

use approx::assert_relative_eq;
use common::{create_grouped_df, f64_values};
use polars::prelude::*;
use robust_polars::{
    ConfInt, CorrelationType, Error, Lm2, Lm2Options, PermutationStatistic, RegressionExt, Robust,
};

#[test]
fn test_second_level_is_mean_of_first_level() {
    let df = create_grouped_df(15, 20, 1.0, 1);
    let model = df.lm2("y ~ x", "subject", &Lm2Options::default()).unwrap();

    let first = model.first_level().unwrap();
    assert_eq!(first.shape(), (15, 3));
    let names: Vec<String> = first
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["subject", "Intercept", "x"]);

    let slopes = f64_values(&first, "x");
    let mean = slopes.iter().sum::<f64>() / slopes.len() as f64;
    let row = model.coefs().unwrap().get("x").unwrap().estimate;
    assert_relative_eq!(row, mean, epsilon = 1e-10);
    assert_eq!(model.coefs().unwrap().numeric_column("DF"), Some(vec![14.0, 14.0]));
}

#[test]
fn test_group_labels_in_first_appearance_order() {
    let df = create_grouped_df(4, 6, 1.0, 2);
    let model = df.lm2("y ~ x", "subject", &Lm2Options::default()).unwrap();
    let first = model.first_level().unwrap();
    let labels: Vec<Option<&str>> = first
        .column("subject")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        labels,
        vec![Some("subject_0"), Some("subject_1"), Some("subject_2"), Some("subject_3")]
    );
}

#[test]
fn test_robust_true_is_hc0() {
    let df = create_grouped_df(10, 12, 1.0, 3);
    let options = Lm2Options::default().with_robust(Robust::from(true));
    let model = df.lm2("y ~ x", "subject", &options).unwrap();
    assert_eq!(model.result().unwrap().se_type(), "robust (hc0)");
}

#[test]
fn test_cluster_rejected() {
    let df = create_grouped_df(10, 12, 1.0, 4);
    let options = Lm2Options::default().with_robust("cluster".parse().unwrap());
    assert!(matches!(
        df.lm2("y ~ x", "subject", &options),
        Err(Error::Regression(robust_core::Error::InvalidParameter(_)))
    ));
}

#[test]
fn test_correlations_omit_intercept() {
    let df = create_grouped_df(10, 15, 1.0, 5);
    let options = Lm2Options::default().with_to_corrs(CorrelationType::Semi);
    let model = df.lm2("y ~ x", "subject", &options).unwrap();
    assert_eq!(model.coefs().unwrap().names(), &["x".to_string()]);
    let first = model.first_level().unwrap();
    assert_eq!(first.shape(), (10, 2));
    // fisher-z of a strong positive correlation
    assert!(f64_values(&first, "x").iter().all(|z| *z > 0.0));
}

#[test]
fn test_sign_flip_permutation() {
    let df = create_grouped_df(12, 15, 1.0, 6);
    let options = Lm2Options::default()
        .with_permute(500)
        .with_perm_on(PermutationStatistic::Mean)
        .with_seed(3);
    let model = df.lm2("y ~ x", "subject", &options).unwrap();
    let frame = model.coefs_frame().unwrap();
    assert!(frame.column("Num_perm").is_ok());
    let p = f64_values(&frame, "Perm-P-val");
    // every subject slope is positive: no flip pattern is as extreme except the identity
    assert!(p[1] < 0.01);
    assert_eq!(model.result().unwrap().sig_type(), "permutation (500)");
    assert!(model.warnings().is_empty());
}

#[test]
fn test_bootstrapped_second_level() {
    let df = create_grouped_df(12, 15, 1.0, 7);
    let options = Lm2Options::default()
        .with_conf_int(ConfInt::Boot)
        .with_n_boot(400)
        .with_seed(8);
    let model = df.lm2("y ~ x", "subject", &options).unwrap();
    let table = model.coefs().unwrap();
    assert_eq!(table.columns(), &["Estimate", "2.5_ci", "97.5_ci", "SE", "T-stat", "Sig"]);
    assert_eq!(table.get("x").unwrap().sig, "*");
}

#[test]
fn test_summary_and_unfitted() {
    let df = create_grouped_df(5, 10, 1.0, 8);
    let mut model = Lm2::new("y ~ x", &df, "subject").unwrap();
    assert!(model.first_level().is_err());
    model.fit(&Lm2Options::default()).unwrap();
    let summary = model.summary().unwrap();
    assert!(summary.contains("Groups: subject (5)"));
    assert!(summary.contains("First level: betas"));
}
