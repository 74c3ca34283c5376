//! End-to-end batch run: prices → returns → volatility → evaluation → option price

use crate::config::{DataConfig, OptionConfig, PipelineConfig};
use crate::data::{save_price_data, DataLoader, PriceSeries, ReturnSeries, SavedPaths};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate_forecasts, walk_forward_forecast, ForecastTable};
use crate::report::{DataSummary, GarchSummary, LatestVolatility, PricingSummary, SummaryReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vol_math::ewma::ewma_volatility;
use vol_math::historical::rolling_volatility;
use vol_math::options::black_scholes::price_option;
use vol_math::options::monte_carlo::{convergence_curve, price_european_option_mc_ci};
use vol_math::{
    fit_garch11, EwmaModel, Garch11Model, GarchFit, HistoricalModel, OptionParams,
    VarianceForecaster,
};

/// Prices, returns and where they were written
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub prices: PriceSeries,
    pub returns: ReturnSeries,
    pub saved: SavedPaths,
}

/// Artifacts of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub prepared: PreparedData,
    pub volatility_path: PathBuf,
    pub forecasts: ForecastTable,
    pub report: SummaryReport,
    pub report_path: PathBuf,
}

/// Load, filter, compute returns and save the data files
pub fn prepare_data(config: &DataConfig) -> Result<PreparedData> {
    let prices = DataLoader::from_csv(&config.input, &config.ticker)?
        .filter_dates(config.start, config.end)?;
    let returns = prices.log_returns()?;
    let saved = save_price_data(&prices, &returns, &config.base_dir)?;

    info!(
        ticker = prices.ticker(),
        prices = prices.len(),
        returns = returns.len(),
        "Prepared price data"
    );
    Ok(PreparedData {
        prices,
        returns,
        saved,
    })
}

/// In-sample annualized volatility series of all three models
struct VolatilitySeries {
    historical: Vec<Option<f64>>,
    ewma: Vec<f64>,
    garch: Vec<f64>,
}

fn write_volatility_csv(
    returns: &ReturnSeries,
    vols: &VolatilitySeries,
    base_dir: &Path,
) -> Result<PathBuf> {
    let dir = base_dir.join("data").join("processed");
    fs::create_dir_all(&dir)?;
    let path = dir.join("volatility.csv");

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(["date", "log_return", "hist_vol", "ewma_vol", "garch_vol"])?;
    for (i, (d, r)) in returns.dates.iter().zip(&returns.values).enumerate() {
        let hist = vols.historical[i].map_or_else(String::new, |v| v.to_string());
        writer.write_record([
            d.to_string(),
            r.to_string(),
            hist,
            vols.ewma[i].to_string(),
            vols.garch[i].to_string(),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), "Saved volatility series");
    Ok(path)
}

/// Run every stage and write the summary report
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let periods = config.evaluation.periods_per_year;
    let m = &config.models;

    // 1. data
    let prepared = prepare_data(&config.data)?;
    let returns = &prepared.returns;

    // 2. in-sample volatility
    let garch_config = m.garch_config();
    let fit = fit_garch11(&returns.values, &garch_config)?;
    let vols = VolatilitySeries {
        historical: rolling_volatility(&returns.values, m.hist_window, true, periods)?,
        ewma: ewma_volatility(&returns.values, m.ewma_lambda, true, periods)?,
        garch: fit.conditional_volatility(true, periods),
    };
    if vols.ewma.len() != returns.len() || vols.garch.len() != returns.len() {
        return Err(ForecastError::DataError(
            "Volatility series do not align with returns".to_string(),
        ));
    }
    let volatility_path = write_volatility_csv(returns, &vols, &config.data.base_dir)?;

    // 3. walk-forward evaluation
    let models: Vec<Box<dyn VarianceForecaster>> = vec![
        Box::new(HistoricalModel::new(m.hist_window)?),
        Box::new(EwmaModel::new(m.ewma_lambda)?),
        Box::new(Garch11Model::new(garch_config)),
    ];
    let e = &config.evaluation;
    let forecasts = walk_forward_forecast(returns, &models, e.initial_train, e.training)?;
    let metrics = evaluate_forecasts(
        &forecasts,
        &returns.values,
        &e.realized_windows,
        e.annualize_pred,
        periods,
    )?;
    info!("Forecast evaluation:\n{}", metrics);

    // 4-5. option pricing with the GARCH next-day forecast
    let garch = garch_summary(&fit, periods);
    let pricing = price_with_forecast(
        &config.option,
        &prepared.prices,
        garch.next_variance_annualized,
    )?;

    let latest = LatestVolatility {
        historical: vols.historical.last().copied().flatten(),
        ewma: vols.ewma.last().copied().unwrap_or(f64::NAN),
        garch: vols.garch.last().copied().unwrap_or(f64::NAN),
    };

    // 6. report
    let report = SummaryReport {
        data: data_summary(&prepared)?,
        latest,
        garch,
        metrics,
        pricing,
    };
    let report_path = report.write_to(&config.data.base_dir)?;

    Ok(PipelineOutput {
        prepared,
        volatility_path,
        forecasts,
        report,
        report_path,
    })
}

fn data_summary(prepared: &PreparedData) -> Result<DataSummary> {
    let prices = &prepared.prices;
    match (prices.dates().first(), prices.dates().last(), prices.last_price()) {
        (Some(first), Some(last), Some(last_price)) => Ok(DataSummary {
            ticker: prices.ticker().to_string(),
            first_date: *first,
            last_date: *last,
            n_prices: prices.len(),
            n_returns: prepared.returns.len(),
            last_price,
        }),
        _ => Err(ForecastError::DataError("Price series is empty".to_string())),
    }
}

fn garch_summary(fit: &GarchFit, periods: usize) -> GarchSummary {
    GarchSummary {
        params: fit.params(),
        scale: fit.scale(),
        log_likelihood: fit.log_likelihood(),
        aic: fit.aic(),
        bic: fit.bic(),
        converged: fit.converged(),
        next_variance_annualized: fit.forecast_next_variance() * periods as f64,
    }
}

/// Price the configured option at the last observed price
pub fn price_with_forecast(
    option: &OptionConfig,
    prices: &PriceSeries,
    annual_variance: f64,
) -> Result<PricingSummary> {
    let spot = prices
        .last_price()
        .ok_or_else(|| ForecastError::DataError("Price series is empty".to_string()))?;
    let params = OptionParams::new(
        spot,
        option.moneyness * spot,
        option.rate,
        annual_variance.sqrt(),
        option.maturity,
    );

    let black_scholes = price_option(&params, option.option_type)?.price;
    let monte_carlo =
        price_european_option_mc_ci(&params, option.option_type, &option.monte_carlo())?;
    let convergence = convergence_curve(
        &params,
        option.option_type,
        option.steps,
        &option.path_grid,
        option.seed,
    )?;

    info!(
        volatility = params.volatility,
        black_scholes,
        monte_carlo = monte_carlo.price,
        "Priced option"
    );
    Ok(PricingSummary {
        option_type: option.option_type,
        params,
        black_scholes,
        monte_carlo,
        convergence,
    })
}
