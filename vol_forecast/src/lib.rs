//! # Vol Forecast
//!
//! Out-of-sample evaluation of daily volatility forecasts, and option
//! pricing driven by the forecast.
//!
//! ## Features
//!
//! - Price CSV loading with adjusted-close detection (polars)
//! - Walk-forward forecasts with expanding or rolling training windows
//! - Forecast losses against realized-volatility proxies (MSE, MAE, QLIKE)
//! - Black–Scholes and Monte Carlo pricing at the forecast volatility
//! - A markdown summary report
//!
//! ## Quick Start
//!
//! ```no_run
//! use vol_forecast::config::PipelineConfig;
//! use vol_forecast::pipeline::run_pipeline;
//!
//! let mut config = PipelineConfig::default();
//! config.data.input = "data/raw/SPY.csv".into();
//! let output = run_pipeline(&config)?;
//! println!("{}", output.report.metrics);
//! # Ok::<(), vol_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod pipeline;
pub mod report;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, PriceSeries, ReturnSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{ForecastTable, MetricRow, MetricTable, TrainingWindow};
pub use crate::pipeline::{run_pipeline, PipelineOutput};
pub use crate::report::SummaryReport;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
