//! Black–Scholes closed-form pricing for European options

use super::{OptionParams, OptionType};
use crate::{MathError, Result};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Price together with the d1/d2 terms it was built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesResult {
    pub price: f64,
    pub d1: f64,
    pub d2: f64,
}

/// Sensitivities of a European option.
///
/// Vega and rho are per unit change (not per 1%); theta is per year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| MathError::CalculationError(e.to_string()))
}

/// Black–Scholes d1 and d2
pub fn d1_d2(params: &OptionParams) -> Result<(f64, f64)> {
    params.validate()?;
    let OptionParams {
        spot,
        strike,
        rate,
        volatility: vol,
        maturity: t,
    } = *params;

    let vol_sqrt_t = vol * t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * t) / vol_sqrt_t;
    Ok((d1, d1 - vol_sqrt_t))
}

/// Price a European option
pub fn price_option(params: &OptionParams, option_type: OptionType) -> Result<BlackScholesResult> {
    let (d1, d2) = d1_d2(params)?;
    let n = standard_normal()?;
    let df = params.discount_factor();

    let price = match option_type {
        OptionType::Call => params.spot * n.cdf(d1) - params.strike * df * n.cdf(d2),
        OptionType::Put => params.strike * df * n.cdf(-d2) - params.spot * n.cdf(-d1),
    };

    Ok(BlackScholesResult { price, d1, d2 })
}

/// Analytical Greeks
pub fn greeks(params: &OptionParams, option_type: OptionType) -> Result<Greeks> {
    let (d1, d2) = d1_d2(params)?;
    let n = standard_normal()?;
    let df = params.discount_factor();
    let sqrt_t = params.maturity.sqrt();
    let pdf_d1 = n.pdf(d1);

    let gamma = pdf_d1 / (params.spot * params.volatility * sqrt_t);
    let vega = params.spot * pdf_d1 * sqrt_t;
    let decay = -params.spot * pdf_d1 * params.volatility / (2.0 * sqrt_t);

    let greeks = match option_type {
        OptionType::Call => Greeks {
            delta: n.cdf(d1),
            gamma,
            vega,
            theta: decay - params.rate * params.strike * df * n.cdf(d2),
            rho: params.strike * params.maturity * df * n.cdf(d2),
        },
        OptionType::Put => Greeks {
            delta: n.cdf(d1) - 1.0,
            gamma,
            vega,
            theta: decay + params.rate * params.strike * df * n.cdf(-d2),
            rho: -params.strike * params.maturity * df * n.cdf(-d2),
        },
    };

    Ok(greeks)
}
