//! Volatility pipeline CLI
//!
//! Prepares daily price data, runs the full forecast-and-price pipeline, or
//! prices a single European option.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vol_forecast::config::{DataConfig, PipelineConfig};
use vol_forecast::pipeline::{prepare_data, run_pipeline};
use vol_math::options::black_scholes::price_option;
use vol_math::options::monte_carlo::{price_european_option_mc_ci, MonteCarloConfig};
use vol_math::{OptionParams, OptionType};

#[derive(Parser)]
#[command(name = "vol_pipeline")]
#[command(about = "Volatility forecasting and option pricing pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Overrides for the data section of the configuration
#[derive(clap::Args)]
struct DataArgs {
    /// Price CSV with a date column and Adj Close or Close
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Ticker symbol (selects the column in multi-ticker files)
    #[arg(short, long)]
    ticker: Option<String>,

    /// First date to keep (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Directory under which data/ and reports/ are written
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

impl DataArgs {
    fn apply(self, data: &mut DataConfig) {
        if let Some(input) = self.input {
            data.input = input;
        }
        if let Some(ticker) = self.ticker {
            data.ticker = ticker;
        }
        if self.start.is_some() {
            data.start = self.start;
        }
        if self.end.is_some() {
            data.end = self.end;
        }
        if let Some(base_dir) = self.base_dir {
            data.base_dir = base_dir;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load prices, compute log returns and write the data files
    Prepare {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Run the full pipeline and write reports/summary.md
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Price a European option with Black–Scholes and Monte Carlo
    Price {
        #[arg(long, default_value = "100.0")]
        spot: f64,

        #[arg(long, default_value = "100.0")]
        strike: f64,

        /// Continuously compounded risk-free rate
        #[arg(long, default_value = "0.02")]
        rate: f64,

        /// Annualized volatility
        #[arg(long, default_value = "0.2")]
        vol: f64,

        /// Years to expiry
        #[arg(long, default_value = "0.25")]
        maturity: f64,

        /// call or put
        #[arg(long, default_value = "call")]
        option_type: OptionType,

        /// Number of Monte Carlo paths
        #[arg(long, default_value = "50000")]
        paths: usize,

        /// Time steps per path
        #[arg(long, default_value = "252")]
        steps: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Prepare { data } => {
            let mut config = DataConfig::default();
            data.apply(&mut config);
            let prepared = prepare_data(&config)?;

            println!(
                "{}: {} prices, {} returns",
                prepared.prices.ticker(),
                prepared.prices.len(),
                prepared.returns.len()
            );
            println!("  {}", prepared.saved.prices.display());
            println!("  {}", prepared.saved.returns.display());
        }

        Commands::Run { config, data } => {
            let mut pipeline_config = match config {
                Some(path) => {
                    info!("Loading configuration from {}", path.display());
                    PipelineConfig::from_json_file(&path)?
                }
                None => PipelineConfig::default(),
            };
            data.apply(&mut pipeline_config.data);

            let output = run_pipeline(&pipeline_config)?;
            println!("{}", output.report.metrics);
            let pricing = &output.report.pricing;
            println!(
                "{} at sigma={:.4}: BS {:.4}, MC {:.4} [{:.4}, {:.4}]",
                pricing.option_type,
                pricing.params.volatility,
                pricing.black_scholes,
                pricing.monte_carlo.price,
                pricing.monte_carlo.ci_low,
                pricing.monte_carlo.ci_high
            );
            println!("Report written to {}", output.report_path.display());
        }

        Commands::Price {
            spot,
            strike,
            rate,
            vol,
            maturity,
            option_type,
            paths,
            steps,
            seed,
        } => {
            let params = OptionParams::new(spot, strike, rate, vol, maturity);
            let bs = price_option(&params, option_type)?;
            let mc_config = MonteCarloConfig {
                steps,
                n_paths: paths,
                seed: Some(seed),
            };
            let mc = price_european_option_mc_ci(&params, option_type, &mc_config)?;

            println!(
                "European {} (S={}, K={}, r={}, sigma={}, T={})",
                option_type, spot, strike, rate, vol, maturity
            );
            println!("{:-<60}", "");
            println!("{:<16} {:>12.4}", "Black-Scholes", bs.price);
            println!(
                "{:<16} {:>12.4}  (se {:.4}, 95% CI [{:.4}, {:.4}])",
                "Monte Carlo", mc.price, mc.std_error, mc.ci_low, mc.ci_high
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parses_known_names() {
        let cli = Cli::try_parse_from(["vol_pipeline", "--log-level", "debug", "price"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(Level::from(cli.log_level), Level::DEBUG);

        let cli = Cli::try_parse_from(["vol_pipeline", "price"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(Cli::try_parse_from(["vol_pipeline", "--log-level", "loud", "price"]).is_err());
        assert!(Cli::try_parse_from(["vol_pipeline", "prepare", "-l", "verbose"]).is_err());
    }
}
