mod common;

use approx::assert_relative_eq;
use chrono::NaiveDate;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};
use vol_forecast::data::{extract_adj_close, save_price_data, DataLoader, PriceSeries};
use vol_forecast::ForecastError;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_data_loader_from_csv_prefers_adj_close() {
    let dir = tempdir().unwrap();
    let dates = common::business_days(30);
    let prices = common::garch_prices(30, 5);
    let path = common::write_price_csv(dir.path(), "SPY.csv", &dates, &prices);

    let series = DataLoader::from_csv(&path, "SPY").unwrap();

    assert_eq!(series.len(), 30);
    assert_eq!(series.ticker(), "SPY");
    assert_eq!(series.dates(), dates.as_slice());
    for (loaded, expected) in series.prices().iter().zip(&prices) {
        assert_relative_eq!(*loaded, *expected, epsilon = 1e-5);
    }
}

#[test]
fn test_data_loader_sorts_and_drops_missing_prices() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,close").unwrap();
    writeln!(file, "2023-01-04,103.0").unwrap();
    writeln!(file, "2023-01-02,100.0").unwrap();
    writeln!(file, "2023-01-03,").unwrap();
    writeln!(file, "2023-01-05 00:00:00,104.0").unwrap();

    let series = DataLoader::from_csv(file.path(), "SPY").unwrap();

    assert_eq!(
        series.dates(),
        &[date("2023-01-02"), date("2023-01-04"), date("2023-01-05")]
    );
    assert_eq!(series.prices(), &[100.0, 103.0, 104.0]);
}

#[test]
fn test_data_loader_error_handling() {
    // Non-existent file
    let result = DataLoader::from_csv("nonexistent_file.csv", "SPY");
    assert!(matches!(result, Err(ForecastError::IoError(_))));

    // No price column
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,volume").unwrap();
    writeln!(file, "2023-01-02,1000").unwrap();
    let result = DataLoader::from_csv(file.path(), "SPY");
    match result {
        Err(ForecastError::DataError(msg)) => {
            assert!(msg.contains("Adj Close"));
            assert!(msg.contains("volume"));
        }
        other => panic!("Expected DataError, got {:?}", other),
    }
}

#[test]
fn test_extract_adj_close_falls_back_to_close() {
    let df = df!(
        "Date" => &["2023-01-02", "2023-01-03"],
        "Close" => &[10.0, 11.0]
    )
    .unwrap();

    let prices = extract_adj_close(&df, "SPY").unwrap();
    assert_eq!(prices, vec![Some(10.0), Some(11.0)]);
}

#[test]
fn test_extract_adj_close_multi_ticker_columns() {
    let df = df!(
        "Date" => &["2023-01-02", "2023-01-03"],
        "Adj Close_QQQ" => &[300.0, 301.0],
        "Adj Close_SPY" => &[400.0, 401.0],
        "Close_SPY" => &[402.0, 403.0]
    )
    .unwrap();

    // The ticker's own column wins
    let spy = extract_adj_close(&df, "SPY").unwrap();
    assert_eq!(spy, vec![Some(400.0), Some(401.0)]);

    // Unknown ticker falls back to the first adjusted column
    let other = extract_adj_close(&df, "IWM").unwrap();
    assert_eq!(other, vec![Some(300.0), Some(301.0)]);
}

#[test]
fn test_extract_adj_close_accepts_snake_case() {
    let df = df!(
        "date" => &["2023-01-02"],
        "adj_close" => &[50.0],
        "close" => &[51.0]
    )
    .unwrap();

    assert_eq!(extract_adj_close(&df, "SPY").unwrap(), vec![Some(50.0)]);
}

#[test]
fn test_extract_adj_close_rejects_empty_frame() {
    let df = DataFrame::new(Vec::<Series>::new()).unwrap();
    assert!(matches!(
        extract_adj_close(&df, "SPY"),
        Err(ForecastError::DataError(_))
    ));
}

#[test]
fn test_filter_dates_and_log_returns() {
    let dates = common::business_days(10);
    let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
    let series = PriceSeries::new("SPY", dates.clone(), prices).unwrap();

    let filtered = series
        .filter_dates(Some(dates[2]), Some(dates[6]))
        .unwrap();
    assert_eq!(filtered.len(), 5);
    assert_eq!(filtered.dates().first(), Some(&dates[2]));
    assert_eq!(filtered.dates().last(), Some(&dates[6]));

    let returns = filtered.log_returns().unwrap();
    assert_eq!(returns.len(), 4);
    assert_eq!(returns.dates, dates[3..=6].to_vec());
    assert_relative_eq!(returns.values[0], (103.0f64 / 102.0).ln(), epsilon = 1e-12);

    // Open-ended bounds keep everything on that side
    assert_eq!(series.filter_dates(None, Some(dates[4])).unwrap().len(), 5);
    assert_eq!(series.filter_dates(Some(dates[8]), None).unwrap().len(), 2);

    // Empty or inverted ranges are errors
    assert!(series.filter_dates(Some(dates[6]), Some(dates[2])).is_err());
    assert!(series
        .filter_dates(Some(date("2030-01-01")), None)
        .is_err());
}

#[test]
fn test_price_series_validation() {
    let dates = common::business_days(3);
    assert!(PriceSeries::new("SPY", dates.clone(), vec![1.0, 2.0]).is_err());

    let unsorted = vec![dates[1], dates[0], dates[2]];
    assert!(PriceSeries::new("SPY", unsorted, vec![1.0, 2.0, 3.0]).is_err());

    let single = PriceSeries::new("SPY", vec![dates[0]], vec![1.0]).unwrap();
    assert!(matches!(single.log_returns(), Err(ForecastError::Math(_))));
}

#[test]
fn test_save_price_data_layout() {
    let dir = tempdir().unwrap();
    let dates = common::business_days(4);
    let series = PriceSeries::new("SPY", dates.clone(), vec![100.0, 101.0, 99.0, 102.0]).unwrap();
    let returns = series.log_returns().unwrap();

    let saved = save_price_data(&series, &returns, dir.path()).unwrap();
    assert_eq!(saved.prices, dir.path().join("data/raw/prices.csv"));
    assert_eq!(saved.returns, dir.path().join("data/processed/returns.csv"));

    let raw = fs::read_to_string(&saved.prices).unwrap();
    let raw_lines: Vec<&str> = raw.lines().collect();
    assert_eq!(raw_lines[0], "date,adj_close");
    assert_eq!(raw_lines[1], "2020-01-02,100");
    assert_eq!(raw_lines.len(), 5);

    let processed = fs::read_to_string(&saved.returns).unwrap();
    let lines: Vec<&str> = processed.lines().collect();
    assert_eq!(lines[0], "date,adj_close,log_return");
    assert_eq!(lines[1], "2020-01-02,100,");
    assert_eq!(lines.len(), 5);

    let second: Vec<&str> = lines[2].split(',').collect();
    assert_eq!(second[0], dates[1].to_string());
    let r: f64 = second[2].parse().unwrap();
    assert_relative_eq!(r, (101.0f64 / 100.0).ln(), epsilon = 1e-12);

    // The saved file loads back through the same loader
    let reloaded = DataLoader::from_csv(&saved.prices, "SPY").unwrap();
    assert_eq!(reloaded.prices(), series.prices());
}
