//! Personal stock dashboard: transaction ledger, portfolio valuation, watchlist
//! and CAPM beta analytics over locally stored daily prices.

pub mod auth;
pub mod config;
pub mod csv_store;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod market_data;
pub mod usecases;
