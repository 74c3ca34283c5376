//! European option pricing
//!
//! - `black_scholes`: closed-form prices and Greeks
//! - `monte_carlo`: GBM path simulation with standard-error confidence intervals

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod black_scholes;
pub mod monte_carlo;

/// Option type (call or put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff at expiry for a terminal price
    pub fn payoff(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(MathError::InvalidInput(format!(
                "option type must be 'call' or 'put', got '{}'",
                other
            ))),
        }
    }
}

/// Market and contract inputs for a European option
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionParams {
    /// Current underlying price
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Annualized volatility
    pub volatility: f64,
    /// Time to expiry in years
    pub maturity: f64,
}

impl OptionParams {
    pub fn new(spot: f64, strike: f64, rate: f64, volatility: f64, maturity: f64) -> Self {
        Self {
            spot,
            strike,
            rate,
            volatility,
            maturity,
        }
    }

    /// Reject non-positive or non-finite inputs
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("volatility", self.volatility),
            ("maturity", self.maturity),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(MathError::InvalidInput(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !self.rate.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "rate must be finite, got {}",
                self.rate
            )));
        }
        Ok(())
    }

    /// Discount factor exp(-rT)
    pub fn discount_factor(&self) -> f64 {
        (-self.rate * self.maturity).exp()
    }
}
