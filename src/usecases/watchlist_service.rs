use crate::domain::errors::ServiceResult;
use crate::domain::models::{UserContext, WatchlistItem, normalize_ticker};
use crate::domain::repository::WatchlistStore;
use crate::market_data::MarketDataSource;
use chrono::NaiveDate;
use std::sync::Arc;

pub struct WatchlistService {
    pub market: Arc<dyn MarketDataSource>,
    pub store: Arc<dyn WatchlistStore>,
}

impl WatchlistService {
    pub fn new(market: Arc<dyn MarketDataSource>, store: Arc<dyn WatchlistStore>) -> Self {
        Self { market, store }
    }

    /// Watched tickers with their latest quote; a failed lookup leaves `quote` empty.
    pub async fn list(&self, ctx: &UserContext, as_of: NaiveDate) -> ServiceResult<Vec<WatchlistItem>> {
        let tickers = self.store.list_watchlist(&ctx.username).await?;
        let mut items = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let quote = match self.market.fetch_quote(&ticker, as_of).await {
                Ok(q) => Some(q),
                Err(e) => {
                    tracing::debug!(ticker = %ticker, error = %e, "No quote for watchlist ticker");
                    None
                }
            };
            items.push(WatchlistItem { ticker, quote });
        }
        Ok(items)
    }

    /// `Ok(false)` when the ticker was already watched.
    pub async fn add(&self, ctx: &UserContext, ticker: &str) -> ServiceResult<bool> {
        let ticker = normalize_ticker(ticker)?;
        let added = self.store.add_to_watchlist(&ctx.username, &ticker).await?;
        tracing::info!(user = %ctx.username, ticker = %ticker, added, "Watchlist add");
        Ok(added)
    }

    pub async fn remove(&self, ctx: &UserContext, ticker: &str) -> ServiceResult<bool> {
        let ticker = normalize_ticker(ticker)?;
        let removed = self.store.remove_from_watchlist(&ctx.username, &ticker).await?;
        tracing::info!(user = %ctx.username, ticker = %ticker, removed, "Watchlist remove");
        Ok(removed)
    }
}
