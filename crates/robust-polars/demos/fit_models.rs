//! Fit `Lm` and `Lm2` models on a synthetic dataset
//!
//! Run with `RUST_LOG=debug` to see the fitting trace.

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use robust_polars::{ConfInt, Lm2Options, LmOptions, RegressionExt, WeightsSpec};
use tracing_subscriber::EnvFilter;

/// Thirty subjects with twenty trials each; noise grows with `x`
fn synthetic(seed: u64) -> anyhow::Result<DataFrame> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0)?;

    let mut subject = Vec::new();
    let mut condition = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for s in 0..30 {
        let offset = noise.sample(&mut rng);
        for trial in 0..20 {
            let xi: f64 = rng.gen_range(0.0..10.0);
            let treated = trial % 2 == 0;
            let effect = if treated { 1.5 } else { 0.0 };
            subject.push(format!("s{s:02}"));
            condition.push(if treated { "treated" } else { "control" });
            x.push(xi);
            y.push(2.0 + offset + 0.8 * xi + effect + noise.sample(&mut rng) * (1.0 + 0.3 * xi));
        }
    }

    Ok(df![
        "subject" => subject,
        "condition" => condition,
        "x" => x,
        "y" => y,
    ]?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let df = synthetic(2024)?;

    let classical = df.lm("y ~ x + condition", &LmOptions::default())?;
    println!("{}", classical.summary()?);

    let robust = df.lm(
        "y ~ x + condition",
        &LmOptions::default().with_robust("hc3".parse()?),
    )?;
    println!("{}", robust.summary()?);

    let clustered = df.lm(
        "y ~ x + condition",
        &LmOptions::default()
            .with_robust("cluster".parse()?)
            .with_cluster("subject"),
    )?;
    println!("{}", clustered.coefs_frame()?);

    let welch = df.lm(
        "y ~ condition",
        &LmOptions::default().with_weights(WeightsSpec::Column("condition".to_string())),
    )?;
    println!("{}", welch.summary()?);

    let boot = df.lm(
        "y ~ x + condition",
        &LmOptions::default()
            .with_conf_int(ConfInt::Boot)
            .with_n_boot(1000)
            .with_permute(1000)
            .with_n_jobs(0)
            .with_seed(7),
    )?;
    println!("{}", boot.summary()?);

    let two_stage = df.lm2(
        "y ~ x + condition",
        "subject",
        &Lm2Options::default().with_permute(1000).with_seed(11),
    )?;
    println!("{}", two_stage.summary()?);
    println!("{}", two_stage.first_level()?.head(Some(5)));

    Ok(())
}
