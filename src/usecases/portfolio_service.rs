use crate::domain::errors::ServiceResult;
use crate::domain::models::{NewTransaction, PortfolioReport, Transaction, UserContext};
use crate::domain::repository::LedgerStore;
use crate::market_data::MarketDataSource;
use crate::usecases::portfolio_aggregator::aggregate_portfolio;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PortfolioService {
    pub market: Arc<dyn MarketDataSource>,
    pub ledger: Arc<dyn LedgerStore>,
}

impl PortfolioService {
    pub fn new(market: Arc<dyn MarketDataSource>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { market, ledger }
    }

    /// Validates a purchase against `today` and appends it to the caller's ledger.
    #[tracing::instrument(skip(self, input), fields(user = %ctx.username))]
    pub async fn record_transaction(
        &self,
        ctx: &UserContext,
        input: NewTransaction,
        today: NaiveDate,
    ) -> ServiceResult<Transaction> {
        let tx = input.validate(&ctx.username, today)?;
        let stored = self.ledger.append_transaction(&tx).await?;
        info!(ticker = %stored.ticker, shares = %stored.shares, id = ?stored.id, "Recorded transaction");
        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(user = %ctx.username))]
    pub async fn portfolio(&self, ctx: &UserContext) -> ServiceResult<PortfolioReport> {
        let transactions = self.ledger.list_transactions(&ctx.username).await?;
        if transactions.is_empty() {
            return Ok(PortfolioReport::default());
        }

        let prices = self.resolve_prices(&transactions).await;
        let report = aggregate_portfolio(&transactions, &prices)?;
        debug!(
            positions = report.positions.len(),
            unresolved = report.unresolved.len(),
            "Aggregated portfolio"
        );
        Ok(report)
    }

    // Latest close for each distinct ticker; lookup failures leave the ticker unpriced
    async fn resolve_prices(&self, transactions: &[Transaction]) -> HashMap<String, Decimal> {
        let tickers: BTreeSet<&str> = transactions.iter().map(|t| t.ticker.as_str()).collect();
        let mut prices = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            match self.market.fetch_latest(ticker).await {
                Ok(Some(point)) => {
                    prices.insert(ticker.to_string(), point.price);
                }
                Ok(None) => {}
                Err(e) => warn!(ticker, error = %e, "Price lookup failed"),
            }
        }
        prices
    }
}
