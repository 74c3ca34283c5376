use std::env;
use vol_forecast::DataLoader;
use vol_math::ewma::ewma_volatility;
use vol_math::options::black_scholes::{greeks, price_option};
use vol_math::{fit_garch11, GarchConfig, OptionParams, OptionType, TRADING_DAYS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage: price_from_forecast [prices.csv] [ticker]
    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/raw/SPY.csv".to_string());
    let ticker = args.next().unwrap_or_else(|| "SPY".to_string());

    println!("Loading data from: {}", path);
    let prices = DataLoader::from_csv(&path, &ticker)?;
    let returns = prices.log_returns()?;
    println!("Loaded {} prices, {} returns", prices.len(), returns.len());

    let ewma = ewma_volatility(&returns.values, 0.94, true, TRADING_DAYS)?;
    if let Some(last) = ewma.last() {
        println!("Latest EWMA volatility: {:.2}%", last * 100.0);
    }

    let fit = fit_garch11(&returns.values, &GarchConfig::default())?;
    println!("{}", fit.summary());

    let vol = (fit.forecast_next_variance() * TRADING_DAYS as f64).sqrt();
    let spot = prices.last_price().unwrap_or(100.0);
    let params = OptionParams::new(spot, spot, 0.02, vol, 0.25);

    for option_type in [OptionType::Call, OptionType::Put] {
        let price = price_option(&params, option_type)?;
        let g = greeks(&params, option_type)?;
        println!(
            "3M ATM {}: {:.4} (delta {:.3}, vega {:.3})",
            option_type, price.price, g.delta, g.vega
        );
    }

    Ok(())
}
