//! Return calculations and annualization helpers

use crate::{MathError, Result};

/// Compute log returns r_t = ln(P_t / P_{t-1}).
///
/// The output has one element fewer than the input; element `i` is the
/// return realized between `prices[i]` and `prices[i + 1]`.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if prices.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Need at least 2 prices to compute returns, have {}.",
            prices.len()
        )));
    }

    if let Some((idx, bad)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(MathError::InvalidInput(format!(
            "Price at position {} must be positive and finite, got {}",
            idx, bad
        )));
    }

    Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Annualize a per-period volatility (standard deviation)
pub fn annualize_volatility(daily_vol: f64, periods_per_year: usize) -> f64 {
    daily_vol * (periods_per_year as f64).sqrt()
}

/// Annualize a per-period variance
pub fn annualize_variance(daily_var: f64, periods_per_year: usize) -> f64 {
    daily_var * periods_per_year as f64
}
