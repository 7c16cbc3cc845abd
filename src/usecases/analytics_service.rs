use crate::domain::errors::{ServiceResult, ValidationError};
use crate::domain::models::{CapmReport, IndexQuote, ScatterPoint, normalize_ticker};
use crate::market_data::MarketDataSource;
use crate::usecases::beta_estimator::estimate_from_aligned;
use crate::usecases::return_series::{aligned_returns, annualized_return};
use chrono::{Months, NaiveDate};
use std::sync::Arc;
use tracing::{info, warn};

/// Indices shown on the dashboard overview: (display name, ticker).
pub const MARKET_INDICES: [(&str, &str); 3] = [
    ("S&P 500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("Dow Jones", "^DJI"),
];

pub const MAX_CAPM_YEARS: u32 = 10;

pub struct AnalyticsService {
    pub market: Arc<dyn MarketDataSource>,
    /// Benchmark the beta is measured against.
    pub benchmark: String,
}

impl AnalyticsService {
    pub fn new(market: Arc<dyn MarketDataSource>, benchmark: impl Into<String>) -> Self {
        Self {
            market,
            benchmark: benchmark.into(),
        }
    }

    /// Beta, alpha and annualized return of `ticker` over the last `years` years.
    #[tracing::instrument(skip(self))]
    pub async fn capm(&self, ticker: &str, years: u32, today: NaiveDate) -> ServiceResult<CapmReport> {
        if !(1..=MAX_CAPM_YEARS).contains(&years) {
            return Err(ValidationError::InvalidYears(years).into());
        }
        let ticker = normalize_ticker(ticker)?;
        let start = today
            .checked_sub_months(Months::new(12 * years))
            .unwrap_or(NaiveDate::MIN);

        let asset = self.market.fetch_history(&ticker, start, today).await?;
        let market = self.market.fetch_history(&self.benchmark, start, today).await?;

        let aligned = aligned_returns(&[asset, market])?;
        let fit = estimate_from_aligned(&aligned, &self.benchmark, &ticker)?;

        let asset_returns = aligned.column(&ticker).unwrap_or_default();
        let market_returns = aligned.column(&self.benchmark).unwrap_or_default();
        // estimate_from_aligned already required >= 2 observations
        let annualized = annualized_return(asset_returns).unwrap_or_default();

        let points = aligned
            .dates
            .iter()
            .zip(market_returns.iter().zip(asset_returns))
            .map(|(date, (m, a))| ScatterPoint {
                date: *date,
                market_return: *m,
                asset_return: *a,
            })
            .collect();

        info!(beta = fit.beta, alpha = fit.alpha, observations = fit.observations, "CAPM fit");
        Ok(CapmReport {
            ticker,
            market: self.benchmark.clone(),
            beta: fit.beta,
            alpha: fit.alpha,
            annualized_return: annualized,
            observations: fit.observations,
            points,
        })
    }

    /// Latest close and day change for each of [`MARKET_INDICES`].
    pub async fn market_overview(&self, as_of: NaiveDate) -> Vec<IndexQuote> {
        let mut out = Vec::with_capacity(MARKET_INDICES.len());
        for (name, ticker) in MARKET_INDICES {
            let quote = match self.market.fetch_quote(ticker, as_of).await {
                Ok(q) => Some(q),
                Err(e) => {
                    warn!(ticker, error = %e, "Index quote unavailable");
                    None
                }
            };
            out.push(IndexQuote {
                name: name.to_string(),
                ticker: ticker.to_string(),
                quote,
            });
        }
        out
    }
}
