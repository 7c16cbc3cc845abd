pub mod analytics_service;
pub mod beta_estimator;
pub mod portfolio_aggregator;
pub mod portfolio_service;
pub mod return_series;
pub mod watchlist_service;
