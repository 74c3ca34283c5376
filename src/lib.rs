//! # Volkit
//!
//! Daily volatility forecasting and option pricing.
//!
//! - [`math`]: log returns, historical/EWMA/GARCH(1,1) volatility, and
//!   Black–Scholes and Monte Carlo option pricing
//! - [`forecast`]: price loading, walk-forward forecast evaluation, the
//!   batch pipeline and its markdown report
//!
//! ## Example
//!
//! ```
//! use volkit::math::options::black_scholes::price_option;
//! use volkit::math::{EwmaModel, OptionParams, OptionType, VarianceForecaster};
//!
//! let returns = [
//!     0.01, -0.012, 0.004, 0.02, -0.015, 0.003, -0.007, 0.011, -0.002, 0.009,
//! ];
//! let daily_var = EwmaModel::default().forecast_next_variance(&returns).unwrap();
//! let vol = (daily_var * 252.0).sqrt();
//!
//! let params = OptionParams::new(100.0, 100.0, 0.02, vol, 0.25);
//! let call = price_option(&params, OptionType::Call).unwrap();
//! assert!(call.price > 0.0);
//! ```

pub use vol_forecast as forecast;
pub use vol_math as math;
