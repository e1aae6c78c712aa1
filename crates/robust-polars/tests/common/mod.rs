//! Common test utilities for robust-polars tests

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

/// `y = 1 + 2 x + 0.5 z + noise`, with a two-level `group` column
pub fn create_test_df(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let z: Vec<f64> = (0..n).map(|_| rng.gen_range(-3.0..3.0)).collect();
    let group: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect();
    let y: Vec<f64> = x
        .iter()
        .zip(&z)
        .map(|(x, z)| 1.0 + 2.0 * x + 0.5 * z + noise.sample(&mut rng))
        .collect();
    df!["y" => y, "x" => x, "z" => z, "group" => group].unwrap()
}

/// `n_subjects` subjects with `n_trials` rows each and per-subject slopes around `slope`
pub fn create_grouped_df(n_subjects: usize, n_trials: usize, slope: f64, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut subject = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for s in 0..n_subjects {
        let own_slope = slope + 0.2 * noise.sample(&mut rng);
        let own_intercept = noise.sample(&mut rng);
        for _ in 0..n_trials {
            let xi: f64 = rng.gen_range(0.0..5.0);
            subject.push(format!("subject_{s}"));
            x.push(xi);
            y.push(own_intercept + own_slope * xi + noise.sample(&mut rng));
        }
    }
    df!["subject" => subject, "x" => x, "y" => y].unwrap()
}

/// Extract an f64 column as a plain vector
pub fn f64_values(df: &DataFrame, col_name: &str) -> Vec<f64> {
    df.column(col_name)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}
