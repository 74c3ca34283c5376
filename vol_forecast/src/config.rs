//! Pipeline configuration
//!
//! Every section has defaults, so a JSON file only needs the fields it
//! changes:
//!
//! ```json
//! { "data": { "ticker": "QQQ" }, "option": { "n_paths": 20000 } }
//! ```

use crate::error::{ForecastError, Result};
use crate::evaluation::TrainingWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vol_math::options::monte_carlo::MonteCarloConfig;
use vol_math::{GarchConfig, OptionType, TRADING_DAYS};

/// Input data and output location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub ticker: String,
    /// CSV with a date column and an adjusted close or close column
    pub input: PathBuf,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Root under which `data/` and `reports/` are written
    pub base_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ticker: "SPY".to_string(),
            input: PathBuf::from("data/raw/SPY.csv"),
            start: None,
            end: None,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Volatility model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hist_window: usize,
    pub ewma_lambda: f64,
    pub garch_scale: f64,
    pub garch_max_iters: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hist_window: 21,
            ewma_lambda: vol_math::ewma::DEFAULT_LAMBDA,
            garch_scale: 100.0,
            garch_max_iters: 5000,
        }
    }
}

impl ModelConfig {
    pub fn garch_config(&self) -> GarchConfig {
        GarchConfig {
            scale: self.garch_scale,
            max_iters: self.garch_max_iters,
            ..GarchConfig::default()
        }
    }
}

/// Walk-forward evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Returns used before the first forecast
    pub initial_train: usize,
    pub training: TrainingWindow,
    /// Windows of the realized volatility proxy; empty means squared returns
    pub realized_windows: Vec<usize>,
    pub annualize_pred: bool,
    pub periods_per_year: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            initial_train: 500,
            training: TrainingWindow::Expanding,
            realized_windows: vec![5, 21],
            annualize_pred: true,
            periods_per_year: TRADING_DAYS,
        }
    }
}

/// Option contract and simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionConfig {
    /// Strike as a multiple of the last price
    pub moneyness: f64,
    pub rate: f64,
    /// Years to expiry
    pub maturity: f64,
    pub option_type: OptionType,
    pub steps: usize,
    pub n_paths: usize,
    pub seed: u64,
    /// Path counts for the convergence study
    pub path_grid: Vec<usize>,
}

impl Default for OptionConfig {
    fn default() -> Self {
        Self {
            moneyness: 1.0,
            rate: 0.02,
            maturity: 0.25,
            option_type: OptionType::Call,
            steps: 252,
            n_paths: 50_000,
            seed: 42,
            path_grid: vec![1_000, 5_000, 10_000, 50_000],
        }
    }
}

impl OptionConfig {
    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            steps: self.steps,
            n_paths: self.n_paths,
            seed: Some(self.seed),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub models: ModelConfig,
    pub evaluation: EvaluationConfig,
    pub option: OptionConfig,
}

fn invalid(msg: String) -> ForecastError {
    ForecastError::ConfigError(msg)
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check every numeric constraint before a run
    pub fn validate(&self) -> Result<()> {
        let d = &self.data;
        if d.ticker.trim().is_empty() {
            return Err(invalid("ticker must not be empty".to_string()));
        }
        if let (Some(s), Some(e)) = (d.start, d.end) {
            if s > e {
                return Err(invalid(format!("start {} is after end {}", s, e)));
            }
        }

        let m = &self.models;
        if m.hist_window < 2 {
            return Err(invalid(format!(
                "hist_window must be at least 2, got {}",
                m.hist_window
            )));
        }
        if !(m.ewma_lambda > 0.0 && m.ewma_lambda < 1.0) {
            return Err(invalid(format!(
                "ewma_lambda must be in (0, 1), got {}",
                m.ewma_lambda
            )));
        }
        if !(m.garch_scale.is_finite() && m.garch_scale > 0.0) {
            return Err(invalid(format!(
                "garch_scale must be positive, got {}",
                m.garch_scale
            )));
        }
        if m.garch_max_iters == 0 {
            return Err(invalid("garch_max_iters must be positive".to_string()));
        }

        let e = &self.evaluation;
        if e.initial_train == 0 {
            return Err(invalid("initial_train must be positive".to_string()));
        }
        if let TrainingWindow::Rolling(w) = e.training {
            if w == 0 || w > e.initial_train {
                return Err(invalid(format!(
                    "rolling window must be in 1..={}, got {}",
                    e.initial_train, w
                )));
            }
        }
        if e.realized_windows.iter().any(|w| *w == 0) {
            return Err(invalid("realized windows must be positive".to_string()));
        }
        if e.periods_per_year == 0 {
            return Err(invalid("periods_per_year must be positive".to_string()));
        }

        let o = &self.option;
        if !(o.moneyness.is_finite() && o.moneyness > 0.0) {
            return Err(invalid(format!(
                "moneyness must be positive, got {}",
                o.moneyness
            )));
        }
        if !o.rate.is_finite() {
            return Err(invalid(format!("rate must be finite, got {}", o.rate)));
        }
        if !(o.maturity.is_finite() && o.maturity > 0.0) {
            return Err(invalid(format!(
                "maturity must be positive, got {}",
                o.maturity
            )));
        }
        if o.steps == 0 {
            return Err(invalid("steps must be positive".to_string()));
        }
        if o.n_paths < 2 || o.path_grid.iter().any(|n| *n < 2) {
            return Err(invalid("path counts must be at least 2".to_string()));
        }

        Ok(())
    }
}
