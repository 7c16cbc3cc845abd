use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{AnalyticsError, ValidationError};

// Single close price for one ticker on one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

/// Price history of one ticker (stock or market index), strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from points that are already in date order.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, AnalyticsError> {
        let ticker = ticker.into();
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalyticsError::UnorderedDates {
                    ticker,
                    date: pair[1].date,
                });
            }
        }
        Ok(Self { ticker, points })
    }

    /// Sorts the points by date first; duplicate dates are still rejected.
    pub fn from_unsorted(
        ticker: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, AnalyticsError> {
        points.sort_by_key(|p| p.date);
        Self::new(ticker, points)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Points with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Per-period fractional returns of one ticker. One point shorter than its price series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub ticker: String,
    pub points: Vec<ReturnPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnColumn {
    pub ticker: String,
    pub values: Vec<f64>,
}

/// Return series restricted to the dates they all share.
///
/// Every column has exactly one value per entry of `dates`, and `dates` is
/// strictly ascending. An empty `dates` is a valid result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlignedReturns {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<ReturnColumn>,
}

impl AlignedReturns {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.ticker == ticker)
            .map(|c| c.values.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionResult {
    pub beta: f64,
    pub alpha: f64,
    pub observations: usize,
}

// Ledger row. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub user: String,
    pub ticker: String,
    pub shares: Decimal,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
}

/// Symbols are upper-case letters, digits and `.^=-` (`BRK.B`, `^GSPC`, `EURUSD=X`).
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '^' | '=' | '-'))
}

/// Trims and upper-cases a user-supplied ticker, rejecting anything that is not a symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, ValidationError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ValidationError::EmptyTicker);
    }
    if !is_valid_ticker(&ticker) {
        return Err(ValidationError::InvalidTicker(ticker));
    }
    Ok(ticker)
}

/// Purchase as entered by the user, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub ticker: String,
    pub shares: Decimal,
    pub purchase_price: Decimal,
    pub purchase_date: NaiveDate,
}

impl NewTransaction {
    /// Normalizes the ticker and checks the purchase invariants against `today`.
    pub fn validate(self, user: &str, today: NaiveDate) -> Result<Transaction, ValidationError> {
        let ticker = normalize_ticker(&self.ticker)?;
        if self.shares <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveShares);
        }
        if self.purchase_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice);
        }
        if self.purchase_date > today {
            return Err(ValidationError::FutureDate(self.purchase_date));
        }
        Ok(Transaction {
            id: None,
            user: user.to_string(),
            ticker,
            shares: self.shares,
            purchase_price: self.purchase_price,
            purchase_date: self.purchase_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub ticker: String,
    pub total_shares: Decimal,
    pub total_cost: Decimal,
    pub avg_purchase_price: Decimal,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub gain_loss: Decimal,
    pub gain_loss_pct: Decimal,
    /// Share of the portfolio's current value held in this position, in percent.
    pub allocation_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioTotals {
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_gain_loss: Decimal,
    pub total_gain_loss_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub positions: Vec<PositionSummary>,
    pub totals: PortfolioTotals,
    /// Tickers held in the ledger whose current price could not be resolved.
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub previous_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexQuote {
    pub name: String,
    pub ticker: String,
    pub quote: Option<Quote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistItem {
    pub ticker: String,
    pub quote: Option<Quote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub date: NaiveDate,
    pub market_return: f64,
    pub asset_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapmReport {
    pub ticker: String,
    pub market: String,
    pub beta: f64,
    pub alpha: f64,
    /// Mean daily asset return scaled to a trading year.
    pub annualized_return: f64,
    pub observations: usize,
    pub points: Vec<ScatterPoint>,
}

/// Identity of the caller, passed explicitly into every user-scoped operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
