//! Walk-forward out-of-sample evaluation of variance forecasters

use crate::data::ReturnSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{mae_volatility, mse_variance, qlike_loss, QLIKE_EPS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use vol_math::VarianceForecaster;

/// How much history each forecast is trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scheme", content = "window")]
pub enum TrainingWindow {
    /// All returns before the forecast date
    Expanding,
    /// The last `n` returns before the forecast date
    Rolling(usize),
}

/// One forecast column per model, aligned on forecast dates
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    pub dates: Vec<NaiveDate>,
    /// Position of each row in the return series it was built from
    pub index: Vec<usize>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl ForecastTable {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Forecast variances of the named model
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }
}

/// Produce one-step-ahead variance forecasts for t in `start..n`.
///
/// The forecast dated `returns.dates[t]` only sees returns before position `t`.
/// A model that fails on a given training slice contributes NaN for that row.
pub fn walk_forward_forecast(
    returns: &ReturnSeries,
    models: &[Box<dyn VarianceForecaster>],
    start: usize,
    scheme: TrainingWindow,
) -> Result<ForecastTable> {
    let ReturnSeries {
        dates,
        values: returns,
    } = returns;
    let n = returns.len();
    if dates.len() != n {
        return Err(ForecastError::ValidationError(format!(
            "Dates and returns must have the same length ({} vs {})",
            dates.len(),
            n
        )));
    }
    if start == 0 || start >= n {
        return Err(ForecastError::ValidationError(format!(
            "Initial training size must be in 1..{}, got {}",
            n, start
        )));
    }
    if let TrainingWindow::Rolling(w) = scheme {
        if w == 0 || w > start {
            return Err(ForecastError::ValidationError(format!(
                "Rolling window must be in 1..={}, got {}",
                start, w
            )));
        }
    }

    let mut columns: Vec<(String, Vec<f64>)> = models
        .iter()
        .map(|m| (m.name(), Vec::with_capacity(n - start)))
        .collect();
    let mut failures = vec![0usize; models.len()];

    for t in start..n {
        let train = match scheme {
            TrainingWindow::Expanding => &returns[..t],
            TrainingWindow::Rolling(w) => &returns[t - w..t],
        };

        for (i, model) in models.iter().enumerate() {
            let forecast = match model.forecast_next_variance(train) {
                Ok(v) => v,
                Err(_) => {
                    failures[i] += 1;
                    f64::NAN
                }
            };
            columns[i].1.push(forecast);
        }
    }

    for ((name, _), count) in columns.iter().zip(&failures) {
        if *count > 0 {
            warn!(model = %name, failures = count, "Model could not forecast some dates");
        }
    }
    info!(
        rows = n - start,
        models = models.len(),
        "Walk-forward forecasts complete"
    );

    Ok(ForecastTable {
        dates: dates[start..].to_vec(),
        index: (start..n).collect(),
        columns,
    })
}

/// Backward-looking realized volatility over each window.
///
/// RV_t(w) = √(periods/w · Σ r²) over the `w` returns ending at `t`;
/// `None` until `w` returns exist.
pub fn windowed_realized_volatility(
    returns: &[f64],
    windows: &[usize],
    periods_per_year: usize,
) -> Result<Vec<(usize, Vec<Option<f64>>)>> {
    Ok(windowed_realized_variance(returns, windows, periods_per_year)?
        .into_iter()
        .map(|(w, var)| (w, var.into_iter().map(|v| v.map(f64::sqrt)).collect()))
        .collect())
}

/// Square of [`windowed_realized_volatility`]
pub fn windowed_realized_variance(
    returns: &[f64],
    windows: &[usize],
    periods_per_year: usize,
) -> Result<Vec<(usize, Vec<Option<f64>>)>> {
    if let Some(bad) = windows.iter().find(|w| **w == 0) {
        return Err(ForecastError::ValidationError(format!(
            "Realized volatility window must be positive, got {}",
            bad
        )));
    }

    let squared: Vec<f64> = returns.iter().map(|r| r * r).collect();
    let mut out = Vec::with_capacity(windows.len());
    for &w in windows {
        let scale = periods_per_year as f64 / w as f64;
        let mut sum = 0.0;
        let mut series = Vec::with_capacity(squared.len());
        for t in 0..squared.len() {
            sum += squared[t];
            if t >= w {
                sum -= squared[t - w];
            }
            series.push(if t + 1 >= w { Some(scale * sum.max(0.0)) } else { None });
        }
        out.push((w, series));
    }

    Ok(out)
}

/// Forecast losses for one model against one realized proxy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub model: String,
    /// Realized-volatility window, or `None` for squared returns
    pub window: Option<usize>,
    pub mse_var: f64,
    pub mae_vol: f64,
    pub qlike: f64,
}

/// Evaluate forecast columns against realized variance.
///
/// Without `realized_windows` the proxy is r²_t and forecasts are compared in
/// per-period units. With windows there is one row per (model, window); the
/// forecast is multiplied by `periods_per_year` when `annualize_pred` is set so
/// it is on the same scale as the annualized windowed proxy.
pub fn evaluate_forecasts(
    table: &ForecastTable,
    returns: &[f64],
    realized_windows: &[usize],
    annualize_pred: bool,
    periods_per_year: usize,
) -> Result<MetricTable> {
    if let Some(bad) = table.index.iter().find(|i| **i >= returns.len()) {
        return Err(ForecastError::ValidationError(format!(
            "Forecast row {} is outside the return series of length {}",
            bad,
            returns.len()
        )));
    }

    let mut rows = Vec::new();

    if realized_windows.is_empty() {
        let realized: Vec<Option<f64>> = table
            .index
            .iter()
            .map(|&i| Some(returns[i] * returns[i]))
            .collect();
        for (name, pred) in &table.columns {
            rows.push(score(name, None, pred, &realized)?);
        }
    } else {
        let proxies = windowed_realized_variance(returns, realized_windows, periods_per_year)?;
        let scale = if annualize_pred {
            periods_per_year as f64
        } else {
            1.0
        };
        for (name, pred) in &table.columns {
            let scaled: Vec<f64> = pred.iter().map(|p| p * scale).collect();
            for (w, proxy) in &proxies {
                let realized: Vec<Option<f64>> = table.index.iter().map(|&i| proxy[i]).collect();
                rows.push(score(name, Some(*w), &scaled, &realized)?);
            }
        }
    }

    Ok(MetricTable { rows })
}

fn score(
    model: &str,
    window: Option<usize>,
    pred_var: &[f64],
    realized_var: &[Option<f64>],
) -> Result<MetricRow> {
    let usable = pred_var
        .iter()
        .zip(realized_var)
        .filter(|(p, r)| p.is_finite() && r.map_or(false, f64::is_finite))
        .count();
    if usable == 0 {
        // Every forecast failed or fell outside the realized range
        warn!(model, ?window, "No usable forecasts; metrics set to NaN");
        return Ok(MetricRow {
            model: model.to_string(),
            window,
            mse_var: f64::NAN,
            mae_vol: f64::NAN,
            qlike: f64::NAN,
        });
    }

    let pred_vol: Vec<f64> = pred_var.iter().map(|v| v.max(0.0).sqrt()).collect();
    Ok(MetricRow {
        model: model.to_string(),
        window,
        mse_var: mse_variance(pred_var, realized_var)?,
        mae_vol: mae_volatility(&pred_vol, realized_var)?,
        qlike: qlike_loss(pred_var, realized_var, QLIKE_EPS)?,
    })
}

/// Collection of metric rows
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricTable {
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    /// Row for a model and realized window
    pub fn get(&self, model: &str, window: Option<usize>) -> Option<&MetricRow> {
        self.rows
            .iter()
            .find(|r| r.model == model && r.window == window)
    }

    /// Model with the lowest QLIKE for the given window
    pub fn best_by_qlike(&self, window: Option<usize>) -> Option<&MetricRow> {
        self.rows
            .iter()
            .filter(|r| r.window == window && r.qlike.is_finite())
            .min_by(|a, b| a.qlike.total_cmp(&b.qlike))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for MetricTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>8} {:>14} {:>12} {:>12}",
            "model", "window", "mse_var", "mae_vol", "qlike"
        )?;
        for row in &self.rows {
            let window = row
                .window
                .map_or_else(|| "r^2".to_string(), |w| w.to_string());
            writeln!(
                f,
                "{:<12} {:>8} {:>14.6e} {:>12.6} {:>12.6}",
                row.model, window, row.mse_var, row.mae_vol, row.qlike
            )?;
        }
        Ok(())
    }
}
