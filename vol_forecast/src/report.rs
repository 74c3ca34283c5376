//! Markdown summary of a pipeline run

use crate::error::Result;
use crate::evaluation::MetricTable;
use chrono::NaiveDate;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vol_math::options::monte_carlo::{McEstimate, MonteCarloResult, Z_95};
use vol_math::{GarchParams, OptionParams, OptionType};

/// Sample covered by the run
#[derive(Debug, Clone, PartialEq)]
pub struct DataSummary {
    pub ticker: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub n_prices: usize,
    pub n_returns: usize,
    pub last_price: f64,
}

/// Annualized volatility at the end of the sample
#[derive(Debug, Clone, PartialEq)]
pub struct LatestVolatility {
    pub historical: Option<f64>,
    pub ewma: f64,
    pub garch: f64,
}

/// Full-sample GARCH(1,1) fit
#[derive(Debug, Clone, PartialEq)]
pub struct GarchSummary {
    /// Parameters in scaled-return units
    pub params: GarchParams,
    pub scale: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub converged: bool,
    /// Next-day variance forecast, annualized
    pub next_variance_annualized: f64,
}

/// Option priced with the forecast volatility
#[derive(Debug, Clone, PartialEq)]
pub struct PricingSummary {
    pub option_type: OptionType,
    pub params: OptionParams,
    pub black_scholes: f64,
    pub monte_carlo: McEstimate,
    pub convergence: Vec<(usize, MonteCarloResult)>,
}

/// Everything written to `reports/summary.md`
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub data: DataSummary,
    pub latest: LatestVolatility,
    pub garch: GarchSummary,
    pub metrics: MetricTable,
    pub pricing: PricingSummary,
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

impl SummaryReport {
    /// Render the report as markdown
    pub fn to_markdown(&self) -> String {
        self.to_string()
    }

    /// Write `reports/summary.md` under `base_dir`
    pub fn write_to<P: AsRef<Path>>(&self, base_dir: P) -> Result<PathBuf> {
        let dir = base_dir.as_ref().join("reports");
        fs::create_dir_all(&dir)?;
        let path = dir.join("summary.md");
        fs::write(&path, self.to_markdown())?;
        info!(path = %path.display(), "Wrote summary report");
        Ok(path)
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data;
        writeln!(f, "# Volatility report: {}", d.ticker)?;
        writeln!(f)?;
        writeln!(f, "## Data")?;
        writeln!(f)?;
        writeln!(f, "- Sample: {} to {}", d.first_date, d.last_date)?;
        writeln!(f, "- Prices: {}", d.n_prices)?;
        writeln!(f, "- Log returns: {}", d.n_returns)?;
        writeln!(f, "- Last price: {:.2}", d.last_price)?;
        writeln!(f)?;

        writeln!(f, "## Latest annualized volatility")?;
        writeln!(f)?;
        writeln!(f, "| model | volatility |")?;
        writeln!(f, "|---|---|")?;
        let hist = self.latest.historical.map_or_else(|| "n/a".to_string(), pct);
        writeln!(f, "| historical | {} |", hist)?;
        writeln!(f, "| ewma | {} |", pct(self.latest.ewma))?;
        writeln!(f, "| garch11 | {} |", pct(self.latest.garch))?;
        writeln!(f)?;

        let g = &self.garch;
        writeln!(f, "## GARCH(1,1)")?;
        writeln!(f)?;
        writeln!(f, "Returns scaled by {} before fitting.", g.scale)?;
        writeln!(f)?;
        writeln!(f, "| parameter | value |")?;
        writeln!(f, "|---|---|")?;
        writeln!(f, "| omega | {:.6} |", g.params.omega)?;
        writeln!(f, "| alpha | {:.6} |", g.params.alpha)?;
        writeln!(f, "| beta | {:.6} |", g.params.beta)?;
        writeln!(f, "| persistence | {:.4} |", g.params.persistence())?;
        if let Some(hl) = g.params.half_life() {
            writeln!(f, "| half-life (days) | {:.2} |", hl)?;
        }
        writeln!(f, "| log-likelihood | {:.2} |", g.log_likelihood)?;
        writeln!(f, "| AIC | {:.2} |", g.aic)?;
        writeln!(f, "| BIC | {:.2} |", g.bic)?;
        writeln!(f, "| converged | {} |", g.converged)?;
        writeln!(
            f,
            "| next-day volatility (annualized) | {} |",
            pct(g.next_variance_annualized.sqrt())
        )?;
        writeln!(f)?;

        writeln!(f, "## Forecast evaluation")?;
        writeln!(f)?;
        if self.metrics.is_empty() {
            writeln!(f, "No evaluation rows.")?;
        } else {
            writeln!(f, "| model | realized proxy | MSE (var) | MAE (vol) | QLIKE |")?;
            writeln!(f, "|---|---|---|---|---|")?;
            for row in &self.metrics.rows {
                let proxy = row
                    .window
                    .map_or_else(|| "r²".to_string(), |w| format!("RV({})", w));
                writeln!(
                    f,
                    "| {} | {} | {:.6e} | {:.6} | {:.6} |",
                    row.model, proxy, row.mse_var, row.mae_vol, row.qlike
                )?;
            }
        }
        writeln!(f)?;

        let p = &self.pricing;
        writeln!(f, "## Option pricing")?;
        writeln!(f)?;
        writeln!(
            f,
            "European {} with S = {:.2}, K = {:.2}, r = {}, T = {} years, σ = {}.",
            p.option_type,
            p.params.spot,
            p.params.strike,
            p.params.rate,
            p.params.maturity,
            pct(p.params.volatility)
        )?;
        writeln!(f)?;
        writeln!(f, "- Black–Scholes: {:.4}", p.black_scholes)?;
        writeln!(
            f,
            "- Monte Carlo: {:.4} (std error {:.4}, 95% CI [{:.4}, {:.4}])",
            p.monte_carlo.price, p.monte_carlo.std_error, p.monte_carlo.ci_low, p.monte_carlo.ci_high
        )?;
        writeln!(f)?;

        if !p.convergence.is_empty() {
            writeln!(f, "### Monte Carlo convergence")?;
            writeln!(f)?;
            writeln!(f, "| paths | price | std error | 95% CI | BS gap |")?;
            writeln!(f, "|---|---|---|---|---|")?;
            for (n, r) in &p.convergence {
                let (lo, hi) = r.confidence_interval(Z_95);
                writeln!(
                    f,
                    "| {} | {:.4} | {:.4} | [{:.4}, {:.4}] | {:+.4} |",
                    n,
                    r.price,
                    r.std_error,
                    lo,
                    hi,
                    r.price - p.black_scholes
                )?;
            }
        }

        Ok(())
    }
}
