//! Tests for `Lm` fits on DataFrames

mod common;

use approx::assert_relative_eq;
use common::{create_grouped_df, create_test_df, f64_values};
use polars::prelude::*;
use robust_polars::{
    ConfInt, CorrelationType, Error, FitWarning, Lm, LmOptions, RegressionExt, Robust,
    WeightsSpec,
};

#[test]
fn test_coefs_frame_columns() {
    let df = create_test_df(80, 1);
    let model = df.lm("y ~ x + z", &LmOptions::default()).unwrap();
    let frame = model.coefs_frame().unwrap();

    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["term", "Estimate", "2.5_ci", "97.5_ci", "SE", "DF", "T-stat", "P-val", "Sig"]
    );
    let terms: Vec<Option<&str>> = frame.column("term").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(terms, vec![Some("Intercept"), Some("x"), Some("z")]);

    let estimates = f64_values(&frame, "Estimate");
    assert_relative_eq!(estimates[1], 2.0, epsilon = 0.15);
    assert_relative_eq!(estimates[2], 0.5, epsilon = 0.2);
    assert_eq!(f64_values(&frame, "DF"), vec![77.0; 3]);
}

#[test]
fn test_categorical_predictor_matches_group_means() {
    let df = df![
        "y" => [1.0, 2.0, 3.0, 5.0, 6.0, 7.0],
        "cond" => ["ctl", "ctl", "ctl", "trt", "trt", "trt"],
    ]
    .unwrap();
    let model = df.lm("y ~ cond", &LmOptions::default()).unwrap();
    let table = model.coefs().unwrap();
    assert_relative_eq!(table.get("Intercept").unwrap().estimate, 2.0, epsilon = 1e-10);
    assert_relative_eq!(table.get("cond[T.trt]").unwrap().estimate, 4.0, epsilon = 1e-10);
}

#[test]
fn test_rows_with_nulls_are_dropped() {
    let df = df![
        "y" => [Some(1.0), Some(2.1), None, Some(3.9), Some(5.2), Some(5.8)],
        "x" => [Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)],
    ]
    .unwrap();
    let model = df.lm("y ~ x", &LmOptions::default()).unwrap();
    assert_eq!(model.result().unwrap().n_obs, 4);
    assert_eq!(model.fits().unwrap().len(), 4);
    assert_eq!(model.coefs().unwrap().numeric_column("DF"), Some(vec![2.0, 2.0]));
}

#[test]
fn test_fitted_plus_residuals_is_response() {
    let df = create_test_df(40, 2);
    let model = df.lm("y ~ x", &LmOptions::default()).unwrap();
    let y = f64_values(&df, "y");
    for ((f, r), y) in model
        .fits()
        .unwrap()
        .iter()
        .zip(model.residuals().unwrap())
        .zip(&y)
    {
        assert_relative_eq!(f + r, *y, epsilon = 1e-10);
    }
}

#[test]
fn test_robust_true_is_hc1() {
    let df = create_test_df(60, 3);
    let default = df
        .lm("y ~ x", &LmOptions::default().with_robust(Robust::from(true)))
        .unwrap();
    let named = df
        .lm("y ~ x", &LmOptions::default().with_robust("hc1".parse().unwrap()))
        .unwrap();
    assert_eq!(default.result().unwrap().se_type(), "robust (hc1)");
    assert_eq!(default.coefs().unwrap(), named.coefs().unwrap());
}

#[test]
fn test_unknown_robust_name_fails() {
    assert!("hc7".parse::<Robust>().is_err());
}

#[test]
fn test_cluster_robust_dof() {
    let df = create_grouped_df(12, 10, 1.0, 4);
    let options = LmOptions::default()
        .with_robust("cluster".parse().unwrap())
        .with_cluster("subject");
    let model = df.lm("y ~ x", &options).unwrap();
    assert_eq!(model.coefs().unwrap().numeric_column("DF"), Some(vec![10.0, 10.0]));
    assert_eq!(model.result().unwrap().se_type(), "robust (cluster)");
}

#[test]
fn test_cluster_column_must_exist() {
    let df = create_test_df(30, 5);
    let options = LmOptions::default()
        .with_robust("cluster".parse().unwrap())
        .with_cluster("site");
    assert!(matches!(df.lm("y ~ x", &options), Err(Error::InvalidColumn(_))));

    let options = LmOptions::default().with_robust("cluster".parse().unwrap());
    assert!(matches!(df.lm("y ~ x", &options), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_group_variance_weights_use_welch_dof() {
    let df = df![
        "y" => [1.0, 1.2, 0.9, 1.1, 1.0, 3.0, 6.0, 2.0, 7.0, 4.5, 5.5],
        "cond" => ["a", "a", "a", "a", "a", "b", "b", "b", "b", "b", "b"],
    ]
    .unwrap();
    let options = LmOptions::default().with_weights(WeightsSpec::Column("cond".into()));
    let model = df.lm("y ~ cond", &options).unwrap();
    let fit = model.result().unwrap();
    assert_eq!(fit.estimator.to_string(), "WLS");

    // Welch-Satterthwaite with v_g = s_g^2 / n_g
    let a = [1.0, 1.2, 0.9, 1.1, 1.0];
    let b = [3.0, 6.0, 2.0, 7.0, 4.5, 5.5];
    let v = |s: &[f64]| {
        let n = s.len() as f64;
        let m = s.iter().sum::<f64>() / n;
        s.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1.0) / n
    };
    let (va, vb) = (v(&a), v(&b));
    let expected = (va + vb).powi(2) / (va * va / 4.0 + vb * vb / 5.0);
    assert_relative_eq!(fit.df, expected, epsilon = 1e-10);

    let mean_b = b.iter().sum::<f64>() / 6.0;
    assert_relative_eq!(
        model.coefs().unwrap().get("cond[T.b]").unwrap().estimate,
        mean_b - 1.04,
        epsilon = 1e-10
    );
}

#[test]
fn test_rank_with_group_weights_uses_ranked_response() {
    let y = vec![1.0, 1.2, 0.9, 1.1, 1.0, 3.0, 6.0, 2.0, 7.0, 4.5, 5.5];
    let groups = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
    let df = df![
        "y" => y.clone(),
        "cond" => ["a", "a", "a", "a", "a", "b", "b", "b", "b", "b", "b"],
    ]
    .unwrap();
    let options = LmOptions::default()
        .with_rank(true)
        .with_weights(WeightsSpec::Column("cond".into()));
    let model = df.lm("y ~ cond", &options).unwrap();

    let ranked = robust_core::utils::rank_average(&y);
    let expected = robust_regression::welch_satterthwaite(&ranked, &groups)
        .unwrap()
        .unwrap();
    assert_relative_eq!(model.result().unwrap().df, expected, epsilon = 1e-10);
}

#[test]
fn test_explicit_weights_length_checked() {
    let df = create_test_df(20, 6);
    let options = LmOptions::default().with_weights(WeightsSpec::Values(vec![1.0; 19]));
    assert!(matches!(df.lm("y ~ x", &options), Err(Error::InvalidInput(_))));

    let options = LmOptions::default().with_weights(WeightsSpec::Values(vec![2.0; 20]));
    let weighted = df.lm("y ~ x", &options).unwrap();
    let plain = df.lm("y ~ x", &LmOptions::default()).unwrap();
    // constant weights leave the estimates unchanged
    assert_relative_eq!(
        weighted.result().unwrap().coefficients[1],
        plain.result().unwrap().coefficients[1],
        epsilon = 1e-10
    );
}

#[test]
fn test_bootstrap_and_permutation() {
    let df = create_test_df(60, 7);
    let options = LmOptions::default()
        .with_conf_int(ConfInt::Boot)
        .with_n_boot(300)
        .with_permute(200)
        .with_seed(42);
    let model = df.lm("y ~ x", &options).unwrap();
    let fit = model.result().unwrap();
    assert_eq!(fit.ci_type(), "boot (300)");
    assert_eq!(fit.sig_type(), "permutation (200)");
    assert!(model
        .warnings()
        .contains(&FitWarning::LowPermutationCount { n_perm: 200 }));

    let frame = model.coefs_frame().unwrap();
    assert!(frame.column("Num_perm").is_ok());
    let p = f64_values(&frame, "Perm-P-val");
    assert_relative_eq!(p[1], 1.0 / 201.0, epsilon = 1e-12);

    let again = df.lm("y ~ x", &options).unwrap();
    assert_eq!(model.coefs().unwrap(), again.coefs().unwrap());
}

#[test]
fn test_rank_regression_fits_average_ranks() {
    let x = vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0, 3.5, 8.0, 7.0];
    let y = vec![2.0, 0.5, 30.0, 0.7, 90.0, 400.0, 1.0, 80.0, 60.0, 20.0, 500.0, 100.0];
    let df = df!["y" => y.clone(), "x" => x.clone()].unwrap();
    let ranked = df.lm("y ~ x", &LmOptions::default().with_rank(true)).unwrap();

    let manual = df![
        "y" => robust_core::utils::rank_average(&y),
        "x" => robust_core::utils::rank_average(&x),
    ]
    .unwrap();
    let expected = manual.lm("y ~ x", &LmOptions::default()).unwrap();
    assert_eq!(ranked.coefs().unwrap(), expected.coefs().unwrap());
    assert!(ranked.design_info().unwrap().is_ranked());
}

#[test]
fn test_predict_with_categories() {
    let df = df![
        "y" => [1.0, 2.0, 3.0, 5.0, 6.0, 7.0, 2.5, 5.5],
        "cond" => ["ctl", "ctl", "ctl", "trt", "trt", "trt", "ctl", "trt"],
        "x" => [0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 1.5, 1.5],
    ]
    .unwrap();
    let model = df.lm("y ~ cond + x", &LmOptions::default()).unwrap();
    let beta = model.result().unwrap().coefficients.clone();
    let new = df!["cond" => ["trt", "ctl"], "x" => [3.0, 3.0]].unwrap();
    let pred = model.predict(&new).unwrap();
    assert_relative_eq!(pred[0], beta[0] + beta[1] + 3.0 * beta[2], epsilon = 1e-10);
    assert_relative_eq!(pred[1], beta[0] + 3.0 * beta[2], epsilon = 1e-10);
}

#[test]
fn test_to_corrs() {
    let df = create_test_df(100, 8);
    let mut model = Lm::new("y ~ x + z", &df).unwrap();
    model.fit(&LmOptions::default()).unwrap();
    let semi = model.to_corrs(CorrelationType::Semi, false).unwrap();
    let partial = model.to_corrs(CorrelationType::Partial, false).unwrap();
    let z = model.to_corrs(CorrelationType::Partial, true).unwrap();
    assert!(semi[0].is_nan() && partial[0].is_nan());
    // a partial correlation is at least as large as the semi-partial one
    assert!(partial[1].abs() >= semi[1].abs());
    assert_relative_eq!(z[1], partial[1].atanh(), epsilon = 1e-12);
}

#[test]
fn test_summary_report() {
    let df = create_test_df(50, 9);
    let model = df
        .lm("y ~ x + group", &LmOptions::default().with_robust("hc2".parse().unwrap()))
        .unwrap();
    let summary = model.summary().unwrap();
    assert!(summary.contains("Formula: y ~ x + group"));
    assert!(summary.contains("Family: gaussian"));
    assert!(summary.contains("robust (hc2)"));
    assert!(summary.contains("group[T.b]"));
    assert!(summary.contains("R^2"));
}

#[test]
fn test_formula_errors_surface() {
    let df = create_test_df(10, 10);
    assert!(matches!(Lm::new("y x", &df), Err(Error::Formula(_))));
    assert!(matches!(
        df.lm("y ~ missing", &LmOptions::default()),
        Err(Error::InvalidColumn(_))
    ));
    assert!(matches!(
        df.lm("group ~ x", &LmOptions::default()),
        Err(Error::TypeMismatch { .. })
    ));
}
