//! # Vol Math
//!
//! Volatility estimation and option pricing over daily return series.
//! This crate provides the numerical core used by `vol_forecast`:
//! log returns, rolling-window historical volatility, EWMA, GARCH(1,1)
//! fitted by maximum likelihood, and European option pricing with
//! Black–Scholes and Monte Carlo under geometric Brownian motion.

use thiserror::Error;

// Model modules
pub mod ewma;
pub mod garch;
pub mod historical;
pub mod options;
pub mod returns;

/// Trading periods per year used for annualization.
pub const TRADING_DAYS: usize = 252;

/// Errors that can occur in volatility and pricing calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Optimization error: {0}")]
    OptimizationError(String),
}

/// Result type for volatility math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// A model that produces a one-step-ahead variance forecast from a
/// training slice of returns.
///
/// Walk-forward evaluation calls this once per forecast date with the
/// returns available up to (but excluding) that date.
pub trait VarianceForecaster {
    /// Label used for the model's forecast column
    fn name(&self) -> String;

    /// Forecast the next period's variance (in per-period units)
    fn forecast_next_variance(&self, train: &[f64]) -> Result<f64>;
}

pub use ewma::EwmaModel;
pub use garch::{fit_garch11, Garch11Model, GarchConfig, GarchFit, GarchParams};
pub use historical::HistoricalModel;
pub use options::{OptionParams, OptionType};

/// Keep only finite values, in order.
pub(crate) fn finite_only(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}
