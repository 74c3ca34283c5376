//! Rolling-window historical volatility
//!
//! Contains:
//! - `RollingStdDev`, an incremental sample standard deviation over a fixed window
//! - `rolling_volatility`, the series form with optional annualization
//! - `forecast_next_variance` and `HistoricalModel` for walk-forward use

use crate::{finite_only, MathError, Result, VarianceForecaster};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Sample (n - 1) standard deviation over the most recent `period` values
#[derive(Debug, Clone)]
pub struct RollingStdDev {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingStdDev {
    /// Create a new RollingStdDev with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period < 2 {
            return Err(MathError::InvalidInput(format!(
                "Window must be at least 2 for a sample standard deviation, got {}",
                period
            )));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push a new value, evicting the oldest once the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Whether a full window has been observed
    pub fn is_ready(&self) -> bool {
        self.values.len() == self.period
    }

    /// Sample variance of the current window
    pub fn variance(&self) -> Result<f64> {
        if !self.is_ready() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for rolling variance. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.values.iter().variance())
    }

    /// Sample standard deviation of the current window
    pub fn value(&self) -> Result<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Rolling standard deviation of returns.
///
/// The result has the same length as `returns`. The first `window - 1`
/// positions are `None`. When `annualize` is set each value is scaled by
/// `sqrt(periods_per_year)`.
pub fn rolling_volatility(
    returns: &[f64],
    window: usize,
    annualize: bool,
    periods_per_year: usize,
) -> Result<Vec<Option<f64>>> {
    let mut std_dev = RollingStdDev::new(window)?;
    let scale = if annualize {
        (periods_per_year as f64).sqrt()
    } else {
        1.0
    };

    let mut out = Vec::with_capacity(returns.len());
    for &r in returns {
        std_dev.update(r);
        out.push(std_dev.value().ok().map(|v| v * scale));
    }

    Ok(out)
}

/// One-step-ahead variance forecast: sample variance of the last `window` returns
pub fn forecast_next_variance(train: &[f64], window: usize) -> Result<f64> {
    if window < 2 {
        return Err(MathError::InvalidInput(format!(
            "Window must be at least 2, got {}",
            window
        )));
    }

    let clean = finite_only(train);
    if clean.len() < window {
        return Err(MathError::InsufficientData(format!(
            "Not enough observations for the specified window. Need {}, have {}.",
            window,
            clean.len()
        )));
    }

    Ok(clean[clean.len() - window..].iter().variance())
}

/// Historical (rolling sample variance) forecaster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoricalModel {
    window: usize,
}

impl HistoricalModel {
    /// Create a new historical model with the given look-back window
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(MathError::InvalidInput(format!(
                "Window must be at least 2, got {}",
                window
            )));
        }
        Ok(Self { window })
    }

    /// Get the look-back window
    pub fn window(&self) -> usize {
        self.window
    }
}

impl VarianceForecaster for HistoricalModel {
    fn name(&self) -> String {
        format!("hist_{}", self.window)
    }

    fn forecast_next_variance(&self, train: &[f64]) -> Result<f64> {
        forecast_next_variance(train, self.window)
    }
}
