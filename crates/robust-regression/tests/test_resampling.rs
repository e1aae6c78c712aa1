mod common;

use robust_regression::{
    fit_linear, ConfInt, CovarianceType, FitOptions, FitWarning, Inference, PermutationScheme,
};

#[test]
fn test_bootstrap_interval_approaches_parametric() {
    let (x, y) = common::linear(200, 2.0, 0.8, 2.0, 99);
    let data = common::simple_data(x, y);

    let parametric = fit_linear(&data, &FitOptions::default()).unwrap();
    let boot = fit_linear(
        &data,
        &FitOptions::default()
            .with_conf_int(ConfInt::Boot)
            .with_n_boot(2000)
            .with_seed(2024),
    )
    .unwrap();

    let width = |fit: &robust_regression::LinearFit| {
        let row = fit.table.get("x").unwrap();
        row.ci_upper - row.ci_lower
    };
    let ratio = width(&boot) / width(&parametric);
    assert!((0.75..1.25).contains(&ratio), "width ratio {ratio}");
    assert!(matches!(
        boot.table.inference(),
        Inference::Bootstrapped { n_boot: 2000 }
    ));
    assert!(boot.warnings.is_empty());
}

#[test]
fn test_bootstrap_is_reproducible_with_seed() {
    let (x, y) = common::linear(50, 1.0, 1.0, 1.0, 1);
    let data = common::simple_data(x, y);
    let opts = FitOptions::default()
        .with_conf_int(ConfInt::Boot)
        .with_n_boot(300)
        .with_seed(77);
    let a = fit_linear(&data, &opts).unwrap();
    let b = fit_linear(&data, &opts.clone().with_n_jobs(4)).unwrap();
    assert_eq!(a.table, b.table);
}

#[test]
fn test_permutation_p_tracks_parametric() {
    let (x, y) = common::linear(100, 1.0, 0.15, 1.0, 314);
    let data = common::simple_data(x, y);

    let parametric = fit_linear(&data, &FitOptions::default()).unwrap();
    let opts = FitOptions::default().with_permute(2000).with_seed(8);
    let permuted = fit_linear(&data, &opts).unwrap();

    let p_param = parametric.table.get("x").unwrap().p_value.unwrap();
    let p_perm = permuted.table.get("x").unwrap().p_value.unwrap();
    assert!(p_perm > 0.0 && p_perm <= 1.0);
    assert!((p_perm - p_param).abs() < 0.06, "perm {p_perm} vs param {p_param}");
    assert!(permuted.warnings.is_empty());
    assert_eq!(
        permuted.table.columns(),
        &["Estimate", "2.5_ci", "97.5_ci", "SE", "Num_perm", "T-stat", "Perm-P-val", "Sig"]
    );
}

#[test]
fn test_robust_permutation_runs_with_low_count_warning() {
    let (x, y) = common::heteroscedastic(60, 4);
    let data = common::simple_data(x, y);
    let opts = FitOptions::default()
        .with_covariance(CovarianceType::Hc3)
        .with_permute(100)
        .with_n_jobs(4)
        .with_seed(5);
    let fit = fit_linear(&data, &opts).unwrap();
    assert_eq!(fit.warnings, vec![FitWarning::LowPermutationCount { n_perm: 100 }]);
    for p in fit.table.p_values().unwrap() {
        assert!(*p >= 1.0 / 101.0 && *p <= 1.0);
    }
}

#[test]
fn test_within_cluster_permutation() {
    let (x, y) = common::linear(80, 0.0, 1.0, 1.0, 55);
    let clusters: Vec<usize> = (0..80).map(|i| i / 8).collect();
    let data = common::simple_data(x, y).with_clusters(clusters).unwrap();
    let opts = FitOptions::default()
        .with_permute(500)
        .with_permutation_scheme(PermutationScheme::WithinClusters)
        .with_seed(3);
    let fit = fit_linear(&data, &opts).unwrap();
    // a strong slope is never matched by a shuffled response
    let p = fit.table.get("x").unwrap().p_value.unwrap();
    assert!((p - 1.0 / 501.0).abs() < 1e-12);
}
