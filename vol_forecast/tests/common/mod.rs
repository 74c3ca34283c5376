#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::fs;
use std::path::{Path, PathBuf};

/// `n` consecutive weekdays starting at 2020-01-02
pub fn business_days(n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut d = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    while out.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(d);
        }
        d += Duration::days(1);
    }
    out
}

/// Prices driven by GARCH(1,1) returns (ω=0.05, α=0.10, β=0.85 in percent units)
pub fn garch_prices(n: usize, seed: u64) -> Vec<f64> {
    let (omega, alpha, beta): (f64, f64, f64) = (0.05, 0.10, 0.85);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sigma2 = omega / (1.0 - alpha - beta);
    let mut price = 100.0;
    let mut out = Vec::with_capacity(n);
    out.push(price);
    for _ in 1..n {
        let z: f64 = rng.sample(StandardNormal);
        let x = sigma2.sqrt() * z;
        price *= (x / 100.0).exp();
        out.push(price);
        sigma2 = omega + alpha * x * x + beta * sigma2;
    }
    out
}

/// Write a yfinance-style CSV with Date, Open, High, Low, Close, Adj Close, Volume
pub fn write_price_csv(dir: &Path, name: &str, dates: &[NaiveDate], prices: &[f64]) -> PathBuf {
    let mut text = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for (d, p) in dates.iter().zip(prices) {
        // Close sits slightly above Adj Close, as after a dividend adjustment
        let close = p * 1.01;
        text.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},1000000\n",
            d,
            close,
            close * 1.01,
            close * 0.99,
            close,
            p
        ));
    }
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}
