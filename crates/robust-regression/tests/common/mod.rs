//! Shared synthetic datasets for integration tests
#![allow(dead_code)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use robust_regression::{DesignMatrix, RegressionData};

/// `y = intercept + slope * x + N(0, sigma)` with `x ~ U(0, 10)`
pub fn linear(
    n: usize,
    intercept: f64,
    slope: f64,
    sigma: f64,
    seed: u64,
) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, sigma).unwrap();
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y = x
        .iter()
        .map(|&xi| intercept + slope * xi + noise.sample(&mut rng))
        .collect();
    (x, y)
}

/// Like [`linear`] but the noise standard deviation grows with `x`
pub fn heteroscedastic(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let unit = Normal::new(0.0, 1.0).unwrap();
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y = x
        .iter()
        .map(|&xi| 1.0 + 0.5 * xi + (0.2 + 0.3 * xi) * unit.sample(&mut rng))
        .collect();
    (x, y)
}

/// Two groups with different means and spreads
pub fn two_groups(n_a: usize, n_b: usize, seed: u64) -> (Vec<f64>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let a = Normal::new(10.0, 1.0).unwrap();
    let b = Normal::new(12.0, 4.0).unwrap();
    let mut y = Vec::with_capacity(n_a + n_b);
    let mut groups = Vec::with_capacity(n_a + n_b);
    for _ in 0..n_a {
        y.push(a.sample(&mut rng));
        groups.push(0);
    }
    for _ in 0..n_b {
        y.push(b.sample(&mut rng));
        groups.push(1);
    }
    (y, groups)
}

pub fn simple_data(x: Vec<f64>, y: Vec<f64>) -> RegressionData {
    RegressionData::new(DesignMatrix::from_columns(&["x"], &[x], y, true).unwrap())
}
