//! Exponentially weighted moving average (EWMA) variance
//!
//! σ²_i = λ·σ²_{i-1} + (1 − λ)·r²_{i-1}

use crate::{finite_only, MathError, Result, VarianceForecaster};

/// RiskMetrics decay for daily data
pub const DEFAULT_LAMBDA: f64 = 0.94;

/// Number of leading squared returns averaged to seed the recursion
const SEED_OBSERVATIONS: usize = 10;

fn validate_lambda(lambda: f64) -> Result<()> {
    if !(lambda > 0.0 && lambda < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "lambda must be in (0, 1), got {}",
            lambda
        )));
    }
    Ok(())
}

fn seed_variance(squared: &[f64], initial_variance: Option<f64>) -> Result<f64> {
    match initial_variance {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) => Err(MathError::InvalidInput(format!(
            "Initial variance must be non-negative and finite, got {}",
            v
        ))),
        None => {
            let head = &squared[..squared.len().min(SEED_OBSERVATIONS)];
            Ok(head.iter().sum::<f64>() / head.len() as f64)
        }
    }
}

/// Compute the EWMA variance series.
///
/// Non-finite returns are dropped first. The element at position `i` is the
/// variance estimate available before observing return `i`.
pub fn ewma_variance(
    returns: &[f64],
    lambda: f64,
    initial_variance: Option<f64>,
) -> Result<Vec<f64>> {
    validate_lambda(lambda)?;

    let squared: Vec<f64> = finite_only(returns).iter().map(|r| r * r).collect();
    if squared.is_empty() {
        return Err(MathError::InsufficientData(
            "EWMA needs at least one finite return".to_string(),
        ));
    }

    let mut variance = Vec::with_capacity(squared.len());
    variance.push(seed_variance(&squared, initial_variance)?);
    for i in 1..squared.len() {
        let prev = variance[i - 1];
        variance.push(lambda * prev + (1.0 - lambda) * squared[i - 1]);
    }

    Ok(variance)
}

/// EWMA volatility series, optionally annualized
pub fn ewma_volatility(
    returns: &[f64],
    lambda: f64,
    annualize: bool,
    periods_per_year: usize,
) -> Result<Vec<f64>> {
    let scale = if annualize {
        (periods_per_year as f64).sqrt()
    } else {
        1.0
    };

    Ok(ewma_variance(returns, lambda, None)?
        .into_iter()
        .map(|v| v.sqrt() * scale)
        .collect())
}

/// EWMA variance forecast for the next period.
///
/// This is the last element of the EWMA series, i.e. the estimate built from
/// every return before the final one.
pub fn forecast_next_variance(
    train: &[f64],
    lambda: f64,
    initial_variance: Option<f64>,
) -> Result<f64> {
    let variance = ewma_variance(train, lambda, initial_variance)?;
    variance.last().copied().ok_or_else(|| {
        MathError::InsufficientData("EWMA needs at least one finite return".to_string())
    })
}

/// EWMA forecaster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaModel {
    lambda: f64,
    initial_variance: Option<f64>,
}

impl EwmaModel {
    /// Create a new EWMA model with decay `lambda`
    pub fn new(lambda: f64) -> Result<Self> {
        validate_lambda(lambda)?;
        Ok(Self {
            lambda,
            initial_variance: None,
        })
    }

    /// Seed the recursion with a fixed variance instead of the sample estimate
    pub fn with_initial_variance(mut self, variance: f64) -> Self {
        self.initial_variance = Some(variance);
        self
    }

    /// Get the decay parameter
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Default for EwmaModel {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
            initial_variance: None,
        }
    }
}

impl VarianceForecaster for EwmaModel {
    fn name(&self) -> String {
        "ewma".to_string()
    }

    fn forecast_next_variance(&self, train: &[f64]) -> Result<f64> {
        forecast_next_variance(train, self.lambda, self.initial_variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RETURNS: [f64; 4] = [0.01, -0.01, 0.015, -0.02];

    #[test]
    fn test_recursion_holds_at_each_step() {
        let variance = ewma_variance(&RETURNS, 0.8, Some(0.0002)).unwrap();
        assert_eq!(variance.len(), RETURNS.len());
        assert_relative_eq!(variance[0], 0.0002);
        for i in 1..variance.len() {
            assert_relative_eq!(
                variance[i],
                0.8 * variance[i - 1] + 0.2 * RETURNS[i - 1].powi(2),
                epsilon = 1e-15
            );
        }
        assert!(variance.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_default_seed_is_mean_of_leading_squares() {
        let variance = ewma_variance(&RETURNS, 0.94, None).unwrap();
        let expected = RETURNS.iter().map(|r| r * r).sum::<f64>() / RETURNS.len() as f64;
        assert_relative_eq!(variance[0], expected, epsilon = 1e-15);

        let long: Vec<f64> = (0..30).map(|i| if i < 10 { 0.02 } else { 0.001 }).collect();
        let variance = ewma_variance(&long, 0.94, None).unwrap();
        assert_relative_eq!(variance[0], 0.0004, epsilon = 1e-15);
    }

    #[test]
    fn test_nan_returns_are_dropped() {
        let with_nan = [f64::NAN, 0.01, -0.01, 0.015, -0.02];
        let a = ewma_variance(&with_nan, 0.9, None).unwrap();
        let b = ewma_variance(&RETURNS, 0.9, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_lambda() {
        assert!(ewma_variance(&RETURNS, 1.0, None).is_err());
        assert!(ewma_variance(&RETURNS, 0.0, None).is_err());
        assert!(EwmaModel::new(1.5).is_err());
    }

    #[test]
    fn test_forecast_is_last_in_sample_variance() {
        let variance = ewma_variance(&RETURNS, 0.94, None).unwrap();
        let forecast = forecast_next_variance(&RETURNS, 0.94, None).unwrap();
        assert_eq!(forecast, variance[3]);
        assert_relative_eq!(forecast, 1.9574955e-4, max_relative = 1e-6);

        // With a fixed seed the final return does not enter the forecast
        let mut shocked = RETURNS;
        shocked[3] = 0.5;
        assert_eq!(
            forecast_next_variance(&shocked, 0.94, Some(0.0002)).unwrap(),
            forecast_next_variance(&RETURNS, 0.94, Some(0.0002)).unwrap()
        );
    }

    #[test]
    fn test_volatility_annualization() {
        let daily = ewma_volatility(&RETURNS, 0.94, false, 252).unwrap();
        let annual = ewma_volatility(&RETURNS, 0.94, true, 252).unwrap();
        for (d, a) in daily.iter().zip(annual.iter()) {
            assert_relative_eq!(*a, d * 252f64.sqrt());
        }
    }
}
