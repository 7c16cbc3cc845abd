use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::errors::MarketDataError;
use crate::domain::models::{PricePoint, PriceSeries, Quote};

// Window scanned backwards from `as_of` when looking for the last two closes
const QUOTE_LOOKBACK_DAYS: u64 = 10;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError>;

    /// Most recent close, or `None` for a ticker the source does not know.
    async fn fetch_latest(&self, ticker: &str) -> Result<Option<PricePoint>, MarketDataError>;

    /// Last close on or before `as_of` with the change from the close before it.
    async fn fetch_quote(
        &self,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Quote, MarketDataError> {
        let start = as_of
            .checked_sub_days(Days::new(QUOTE_LOOKBACK_DAYS))
            .unwrap_or(NaiveDate::MIN);
        let series = self.fetch_history(ticker, start, as_of).await?;
        quote_from_series(&series).ok_or_else(|| MarketDataError::NoData {
            ticker: ticker.to_string(),
            start,
            end: as_of,
        })
    }
}

pub fn quote_from_series(series: &PriceSeries) -> Option<Quote> {
    let points = series.points();
    let last = points.last()?;
    let previous_close = points.len().checked_sub(2).map(|i| points[i].price);
    let change = previous_close.map(|prev| last.price - prev);
    let change_pct = previous_close
        .zip(change)
        .filter(|(prev, _)| !prev.is_zero())
        .map(|(prev, diff)| diff / prev * Decimal::ONE_HUNDRED);
    Some(Quote {
        ticker: series.ticker().to_string(),
        date: last.date,
        price: last.price,
        previous_close,
        change,
        change_pct,
    })
}

// In-memory source for tests and demos
pub struct InMemoryMarketData {
    pub series: HashMap<String, PriceSeries>,
}

impl InMemoryMarketData {
    pub fn new(series: Vec<PriceSeries>) -> Self {
        Self {
            series: series
                .into_iter()
                .map(|s| (s.ticker().to_string(), s))
                .collect(),
        }
    }
}

#[async_trait]
impl MarketDataSource for InMemoryMarketData {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError> {
        let series = self
            .series
            .get(ticker)
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
        Ok(self.series.get(ticker).and_then(|s| s.last().copied()))
    }
}
