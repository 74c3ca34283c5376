//! Daily price series loading and persistence

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vol_math::returns::log_returns;

/// Adjusted close prices for one ticker, sorted ascending by date
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

/// Log returns aligned with the date on which each return is realized
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Data loader for daily price data
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a price series from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, ticker: &str) -> Result<PriceSeries> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        info!(path = %path.display(), rows = df.height(), "Loaded price file");
        Self::from_dataframe(&df, ticker)
    }

    /// Build a price series from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame, ticker: &str) -> Result<PriceSeries> {
        let date_column = Self::detect_date_column(df)?;
        let dates = column_dates(df.column(&date_column)?)?;
        let prices = extract_adj_close(df, ticker)?;

        let mut rows: Vec<(NaiveDate, f64)> = dates
            .into_iter()
            .zip(prices)
            .filter_map(|(d, p)| match (d, p) {
                (Some(d), Some(p)) if p.is_finite() => Some((d, p)),
                _ => None,
            })
            .collect();
        rows.sort_by_key(|(d, _)| *d);
        rows.dedup_by_key(|(d, _)| *d);

        if rows.is_empty() {
            return Err(ForecastError::DataError(
                "No rows with both a date and a price".to_string(),
            ));
        }

        let (dates, prices) = rows.into_iter().unzip();
        Ok(PriceSeries {
            ticker: ticker.to_string(),
            dates,
            prices,
        })
    }

    /// Detect the date column in a DataFrame
    fn detect_date_column(df: &DataFrame) -> Result<String> {
        for name in df.get_column_names() {
            let lower = name.to_lowercase();
            if lower.contains("date") || lower.contains("time") {
                return Ok(name.to_string());
            }
        }

        // Unnamed index columns are written first
        if let Some(first) = df.get_columns().first() {
            if first.dtype().is_temporal() || first.dtype() == &DataType::Utf8 {
                return Ok(first.name().to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }
}

/// Lowercase alphanumerics only, so "Adj Close", "adj_close" and "AdjClose" compare equal
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Find a price column for `field`, preferring the ticker-qualified one
fn find_price_column(names: &[&str], field: &str, ticker: &str) -> Option<String> {
    let field = normalize(field);
    let ticker = normalize(ticker);

    let matches: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| normalize(name).starts_with(&field))
        .collect();

    matches
        .iter()
        .find(|name| {
            let n = normalize(name);
            n == field || (!ticker.is_empty() && n[field.len()..] == ticker)
        })
        .or_else(|| matches.first())
        .map(|name| name.to_string())
}

/// Extract adjusted close prices, falling back to the close column.
///
/// Flattened multi-ticker headers such as "Adj Close_SPY" are accepted; the
/// column for `ticker` is used when present, otherwise the first match.
pub fn extract_adj_close(df: &DataFrame, ticker: &str) -> Result<Vec<Option<f64>>> {
    if df.height() == 0 || df.width() == 0 {
        return Err(ForecastError::DataError(
            "Downloaded data is empty".to_string(),
        ));
    }

    let names = df.get_column_names();
    let column = find_price_column(&names, "Adj Close", ticker)
        .or_else(|| find_price_column(&names, "Close", ticker))
        .ok_or_else(|| {
            ForecastError::DataError(format!(
                "Neither 'Adj Close' nor 'Close' found in columns: {:?}",
                names
            ))
        })?;

    debug!(column = %column, "Using price column");
    let prices = df.column(&column)?.cast(&DataType::Float64)?;
    Ok(prices.f64()?.into_iter().collect())
}

/// Parse a date column that may be typed or plain strings
fn column_dates(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
    match series.dtype() {
        DataType::Utf8 => Ok(series
            .utf8()?
            .into_iter()
            .map(|opt| opt.and_then(parse_date))
            .collect()),
        DataType::Date => Ok(series.date()?.into_iter().map(|d| d.and_then(epoch_days)).collect()),
        DataType::Datetime(_, _) => {
            let as_date = series.cast(&DataType::Date)?;
            Ok(as_date
                .date()?
                .into_iter()
                .map(|d| d.and_then(epoch_days))
                .collect())
        }
        other => Err(ForecastError::DataError(format!(
            "Unsupported date column type {:?} in '{}'",
            other,
            series.name()
        ))),
    }
}

/// Parse the leading YYYY-MM-DD of a date or timestamp string
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

fn epoch_days(days: i32) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
    if days >= 0 {
        epoch.checked_add_days(Days::new(days as u64))
    } else {
        epoch.checked_sub_days(Days::new(days.unsigned_abs() as u64))
    }
}

impl PriceSeries {
    /// Create a price series from parallel date and price vectors
    pub fn new(ticker: &str, dates: Vec<NaiveDate>, prices: Vec<f64>) -> Result<Self> {
        if dates.len() != prices.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates and prices must have the same length ({} vs {})",
                dates.len(),
                prices.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::ValidationError(
                "Dates must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            ticker: ticker.to_string(),
            dates,
            prices,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Last observed price
    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    /// Keep rows with `start <= date <= end`
    pub fn filter_dates(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ForecastError::ValidationError(format!(
                    "Start date {} is after end date {}",
                    s, e
                )));
            }
        }

        let (dates, prices): (Vec<_>, Vec<_>) = self
            .dates
            .iter()
            .zip(&self.prices)
            .filter(|(d, _)| start.map_or(true, |s| **d >= s) && end.map_or(true, |e| **d <= e))
            .map(|(d, p)| (*d, *p))
            .unzip();

        if dates.is_empty() {
            return Err(ForecastError::DataError(format!(
                "No {} prices between {:?} and {:?}",
                self.ticker, start, end
            )));
        }

        Ok(Self {
            ticker: self.ticker.clone(),
            dates,
            prices,
        })
    }

    /// Log returns dated by the later of the two prices
    pub fn log_returns(&self) -> Result<ReturnSeries> {
        let values = log_returns(&self.prices)?;
        Ok(ReturnSeries {
            dates: self.dates[1..].to_vec(),
            values,
        })
    }
}

/// Paths written by [`save_price_data`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPaths {
    pub prices: PathBuf,
    pub returns: PathBuf,
}

/// Write `data/raw/prices.csv` and `data/processed/returns.csv` under `base_dir`
pub fn save_price_data<P: AsRef<Path>>(
    prices: &PriceSeries,
    returns: &ReturnSeries,
    base_dir: P,
) -> Result<SavedPaths> {
    let raw_dir = base_dir.as_ref().join("data").join("raw");
    let processed_dir = base_dir.as_ref().join("data").join("processed");
    fs::create_dir_all(&raw_dir)?;
    fs::create_dir_all(&processed_dir)?;

    let prices_path = raw_dir.join("prices.csv");
    let mut writer = csv::Writer::from_path(&prices_path)?;
    writer.write_record(["date", "adj_close"])?;
    for (d, p) in prices.dates.iter().zip(&prices.prices) {
        writer.write_record([d.to_string(), p.to_string()])?;
    }
    writer.flush()?;

    // Returns are keyed by the later date, so the first price has no return
    let returns_path = processed_dir.join("returns.csv");
    let mut writer = csv::Writer::from_path(&returns_path)?;
    writer.write_record(["date", "adj_close", "log_return"])?;
    let mut next_return = returns.dates.iter().zip(&returns.values).peekable();
    for (d, p) in prices.dates.iter().zip(&prices.prices) {
        let r = match next_return.peek() {
            Some((rd, rv)) if *rd == d => {
                let value = rv.to_string();
                next_return.next();
                value
            }
            _ => String::new(),
        };
        writer.write_record([d.to_string(), p.to_string(), r])?;
    }
    writer.flush()?;

    info!(
        prices = %prices_path.display(),
        returns = %returns_path.display(),
        "Saved price data"
    );
    Ok(SavedPaths {
        prices: prices_path,
        returns: returns_path,
    })
}
