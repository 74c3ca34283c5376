//! Loss functions for variance forecasts
//!
//! Each function pairs forecasts with realized values position by position.
//! Pairs with a missing realized value or a non-finite forecast are skipped.

use crate::error::{ForecastError, Result};

/// Floor applied to forecast variances inside QLIKE
pub const QLIKE_EPS: f64 = 1e-8;

fn usable_pairs<'a>(
    pred: &'a [f64],
    realized: &'a [Option<f64>],
) -> Result<impl Iterator<Item = (f64, f64)> + 'a> {
    if pred.len() != realized.len() {
        return Err(ForecastError::ValidationError(format!(
            "Forecast and realized series must have the same length ({} vs {})",
            pred.len(),
            realized.len()
        )));
    }

    Ok(pred
        .iter()
        .zip(realized)
        .filter_map(|(p, r)| match r {
            Some(r) if p.is_finite() && r.is_finite() => Some((*p, *r)),
            _ => None,
        }))
}

fn mean_over<F>(pred: &[f64], realized: &[Option<f64>], loss: F) -> Result<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let (sum, count) = usable_pairs(pred, realized)?
        .fold((0.0, 0usize), |(sum, count), (p, r)| (sum + loss(p, r), count + 1));

    if count == 0 {
        return Err(ForecastError::ValidationError(
            "No overlapping forecast and realized values".to_string(),
        ));
    }
    Ok(sum / count as f64)
}

/// Mean squared error between forecast and realized variance
pub fn mse_variance(pred_var: &[f64], realized_var: &[Option<f64>]) -> Result<f64> {
    mean_over(pred_var, realized_var, |p, r| (p - r).powi(2))
}

/// Mean absolute error between forecast volatility and √realized variance
pub fn mae_volatility(pred_vol: &[f64], realized_var: &[Option<f64>]) -> Result<f64> {
    mean_over(pred_vol, realized_var, |p, r| (p - r.sqrt()).abs())
}

/// QLIKE loss: mean(ln σ̂² + RV / σ̂²) with σ̂² floored at `eps`
pub fn qlike_loss(pred_var: &[f64], realized_var: &[Option<f64>], eps: f64) -> Result<f64> {
    if !(eps > 0.0) {
        return Err(ForecastError::ValidationError(format!(
            "QLIKE floor must be positive, got {}",
            eps
        )));
    }
    mean_over(pred_var, realized_var, |p, r| {
        let p = p.max(eps);
        p.ln() + r / p
    })
}
