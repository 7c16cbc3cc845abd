//! Daily returns and date alignment of price series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::errors::AnalyticsError;
use crate::domain::models::{AlignedReturns, PriceSeries, ReturnColumn, ReturnPoint, ReturnSeries};

/// Trading days in a year. Annualizing with it assumes the returns are daily;
/// the sampling frequency of the input is never checked.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// `price[t] / price[t-1] - 1` for every date after the first.
///
/// Fails with `InvalidPrice` for an empty series or any price that is not
/// strictly positive.
pub fn daily_returns(series: &PriceSeries) -> Result<ReturnSeries, AnalyticsError> {
    let ticker = series.ticker();
    if series.is_empty() {
        return Err(AnalyticsError::InvalidPrice {
            ticker: ticker.to_string(),
            date: None,
        });
    }

    let mut prices = Vec::with_capacity(series.len());
    for point in series.points() {
        let price = positive_f64(point.price).ok_or_else(|| AnalyticsError::InvalidPrice {
            ticker: ticker.to_string(),
            date: Some(point.date),
        })?;
        prices.push((point.date, price));
    }

    let points = prices
        .windows(2)
        .map(|w| ReturnPoint {
            date: w[1].0,
            value: w[1].1 / w[0].1 - 1.0,
        })
        .collect();

    Ok(ReturnSeries {
        ticker: ticker.to_string(),
        points,
    })
}

fn positive_f64(price: Decimal) -> Option<f64> {
    if price <= Decimal::ZERO {
        return None;
    }
    price.to_f64().filter(|p| p.is_finite() && *p > 0.0)
}

/// Inner join of return series on date, ascending.
pub fn align_returns(series: &[ReturnSeries]) -> AlignedReturns {
    if series.is_empty() {
        return AlignedReturns::default();
    }

    let indexed: Vec<BTreeMap<NaiveDate, f64>> = series
        .iter()
        .map(|s| s.points.iter().map(|p| (p.date, p.value)).collect())
        .collect();

    let dates: Vec<NaiveDate> = indexed[0]
        .keys()
        .filter(|date| indexed[1..].iter().all(|idx| idx.contains_key(*date)))
        .copied()
        .collect();

    let columns = series
        .iter()
        .zip(&indexed)
        .map(|(s, idx)| ReturnColumn {
            ticker: s.ticker.clone(),
            values: dates.iter().map(|d| idx[d]).collect(),
        })
        .collect();

    AlignedReturns { dates, columns }
}

/// Computes returns for each price series and aligns them on shared dates.
pub fn aligned_returns(prices: &[PriceSeries]) -> Result<AlignedReturns, AnalyticsError> {
    let returns = prices
        .iter()
        .map(daily_returns)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(align_returns(&returns))
}

/// Mean period return times [`TRADING_DAYS_PER_YEAR`]. `None` without data.
pub fn annualized_return(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    Some(mean * TRADING_DAYS_PER_YEAR)
}
