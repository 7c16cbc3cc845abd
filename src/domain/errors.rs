//! Error taxonomy for the dashboard core.
//!
//! Analytics failures abort the beta/return computation and are always surfaced
//! to the caller. A missing current price is not an error: the aggregator
//! recovers from it and reports the ticker in `PortfolioReport::unresolved`.

use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the return / regression pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Invalid price in series {ticker} (date: {date:?})")]
    InvalidPrice {
        ticker: String,
        date: Option<NaiveDate>,
    },

    #[error("Series {ticker} is not strictly increasing at {date}")]
    UnorderedDates { ticker: String, date: NaiveDate },

    #[error("Need at least 2 aligned observations, got {0}")]
    InsufficientData(usize),

    #[error("Market returns have zero variance; beta is undefined")]
    DegenerateInput,

    #[error("Return series lengths differ: market {market}, asset {asset}")]
    LengthMismatch { market: usize, asset: usize },

    #[error("Series {0} is not part of the aligned set")]
    MissingSeries(String),

    #[error("Amount out of range while valuing {0}")]
    Overflow(String),
}

/// Failures of a market data source.
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("No prices for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Failed to read price file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to access price data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed price row: {0}")]
    Parse(String),

    #[error(transparent)]
    Series(#[from] AnalyticsError),
}

/// Failures of the persistent stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Storage(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Storage(err.to_string())
    }
}

/// Rejected user input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Ticker must not be empty")]
    EmptyTicker,

    #[error("Invalid ticker symbol: {0}")]
    InvalidTicker(String),

    #[error("Shares must be positive")]
    NonPositiveShares,

    #[error("Purchase price must be positive")]
    NonPositivePrice,

    #[error("Purchase date {0} is in the future")]
    FutureDate(NaiveDate),

    #[error("Years must be between 1 and 10, got {0}")]
    InvalidYears(u32),

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Password must not be empty")]
    EmptyPassword,
}

/// Errors surfaced by the services to the API layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
