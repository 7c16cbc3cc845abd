use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::errors::MarketDataError;
use crate::domain::models::{PricePoint, PriceSeries, is_valid_ticker};
use crate::market_data::MarketDataSource;

#[derive(Debug, Deserialize)]
struct PriceCsv {
    date: String,
    close: String,
}

/// Reads `<dir>/<TICKER>.csv` files with `date,close` columns.
pub struct CsvMarketData {
    dir: PathBuf,
}

impl CsvMarketData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    // None for anything that is not a plain symbol, so a ticker never names a path outside `dir`
    fn path_for(&self, ticker: &str) -> Option<PathBuf> {
        is_valid_ticker(ticker).then(|| self.dir.join(format!("{}.csv", ticker)))
    }

    /// `Ok(None)` when no file exists for the ticker.
    fn read_series(&self, ticker: &str) -> Result<Option<PriceSeries>, MarketDataError> {
        let Some(path) = self.path_for(ticker) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        read_price_file(ticker, &path).map(Some)
    }
}

pub fn read_price_file(ticker: &str, path: &Path) -> Result<PriceSeries, MarketDataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut points = Vec::new();
    for result in rdr.deserialize() {
        let record: PriceCsv = result?;
        let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
            .map_err(|e| MarketDataError::Parse(format!("{}: date '{}': {}", ticker, record.date, e)))?;
        let close = Decimal::from_str(&record.close)
            .map_err(|e| MarketDataError::Parse(format!("{}: close '{}': {}", ticker, record.close, e)))?;
        points.push(PricePoint::new(date, close));
    }
    Ok(PriceSeries::from_unsorted(ticker, points)?)
}

#[async_trait]
impl MarketDataSource for CsvMarketData {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        let series = self
            .read_series(ticker)?
            .ok_or_else(|| MarketDataError::UnknownTicker(ticker.to_string()))?;
        let window = series.between(start, end);
        if window.is_empty() {
            return Err(MarketDataError::NoData {
                ticker: ticker.to_string(),
                start,
                end,
            });
        }
        Ok(window)
    }

    async fn fetch_latest(&self, ticker: &str) -> Result<Option<PricePoint>, MarketDataError> {
        Ok(self.read_series(ticker)?.and_then(|s| s.last().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn reads_and_sorts_price_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("AAPL.csv"),
            "date,close\n2024-01-04, 182.50\n2024-01-02,185.64\n2024-01-03 ,184.25\n",
        )
        .unwrap();
        let store = CsvMarketData::new(dir.path());

        let series = store
            .fetch_history("AAPL", d("2024-01-01"), d("2024-01-31"))
            .await
            .unwrap();
        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d("2024-01-02"), d("2024-01-03"), d("2024-01-04")]);

        let latest = store.fetch_latest("AAPL").await.unwrap().unwrap();
        assert_eq!(latest.price, dec!(182.50));
    }

    #[tokio::test]
    async fn missing_file_is_unknown_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvMarketData::new(dir.path());
        assert!(store.fetch_latest("MSFT").await.unwrap().is_none());
        assert!(matches!(
            store.fetch_history("MSFT", d("2024-01-01"), d("2024-01-31")).await,
            Err(MarketDataError::UnknownTicker(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_dates_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("TSLA.csv"),
            "date,close\n2024-01-02,250\n2024-01-02,251\n",
        )
        .unwrap();
        let store = CsvMarketData::new(dir.path());
        assert!(matches!(
            store.fetch_latest("TSLA").await,
            Err(MarketDataError::Series(_))
        ));
    }

    #[tokio::test]
    async fn bad_close_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NFLX.csv"), "date,close\n2024-01-02,n/a\n").unwrap();
        let store = CsvMarketData::new(dir.path());
        assert!(matches!(
            store.fetch_latest("NFLX").await,
            Err(MarketDataError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn ticker_cannot_escape_price_dir() {
        let root = tempfile::tempdir().unwrap();
        let prices = root.path().join("prices");
        fs::create_dir(&prices).unwrap();
        fs::write(root.path().join("SECRET.csv"), "date,close\n2024-01-02,42\n").unwrap();
        let store = CsvMarketData::new(&prices);

        assert!(store.fetch_latest("../SECRET").await.unwrap().is_none());
        let absolute = root.path().join("SECRET");
        assert!(store.fetch_latest(absolute.to_str().unwrap()).await.unwrap().is_none());
        assert!(matches!(
            store.fetch_history("../SECRET", d("2024-01-01"), d("2024-01-31")).await,
            Err(MarketDataError::UnknownTicker(_))
        ));
    }
}
