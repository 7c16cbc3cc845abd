use crate::domain::errors::AnalyticsError;
use crate::domain::models::{PortfolioReport, PortfolioTotals, PositionSummary, Transaction};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const TOTALS: &str = "portfolio totals";

/// Joins a user's ledger with current prices.
///
/// One position per ticker that has both transactions and a price; tickers
/// without a price are left out of `positions` and listed in `unresolved`.
/// Output is ordered by ticker so identical inputs give identical reports.
///
/// All money arithmetic is checked. Amounts beyond the `Decimal` range fail
/// with `AnalyticsError::Overflow` naming the ticker (or the totals).
pub fn aggregate_portfolio(
    transactions: &[Transaction],
    prices: &HashMap<String, Decimal>,
) -> Result<PortfolioReport, AnalyticsError> {
    // ticker -> (total_shares, total_cost)
    let mut lots: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for tx in transactions {
        let ticker = tx.ticker.as_str();
        let cost = mul(tx.shares, tx.purchase_price, ticker)?;
        let (shares, total) = lots.entry(ticker).or_insert((Decimal::ZERO, Decimal::ZERO));
        *shares = add(*shares, tx.shares, ticker)?;
        *total = add(*total, cost, ticker)?;
    }

    let mut positions = Vec::with_capacity(lots.len());
    let mut unresolved = Vec::new();
    for (ticker, (total_shares, total_cost)) in lots {
        let Some(current_price) = prices.get(ticker).copied() else {
            unresolved.push(ticker.to_string());
            continue;
        };

        let current_value = mul(total_shares, current_price, ticker)?;
        let gain_loss = current_value
            .checked_sub(total_cost)
            .ok_or_else(|| overflow(ticker))?;
        positions.push(PositionSummary {
            ticker: ticker.to_string(),
            total_shares,
            total_cost,
            avg_purchase_price: ratio(total_cost, total_shares, ticker)?,
            current_price,
            current_value,
            gain_loss,
            gain_loss_pct: percent(gain_loss, total_cost, ticker)?,
            allocation_pct: Decimal::ZERO,
        });
    }

    if !unresolved.is_empty() {
        warn!(tickers = ?unresolved, "No current price; tickers excluded from portfolio");
    }

    let mut totals = PortfolioTotals::default();
    for p in &positions {
        totals.total_value = add(totals.total_value, p.current_value, TOTALS)?;
        totals.total_cost = add(totals.total_cost, p.total_cost, TOTALS)?;
        totals.total_gain_loss = add(totals.total_gain_loss, p.gain_loss, TOTALS)?;
    }
    totals.total_gain_loss_pct = percent(totals.total_gain_loss, totals.total_cost, TOTALS)?;

    for p in &mut positions {
        p.allocation_pct = percent(p.current_value, totals.total_value, &p.ticker)?;
    }

    Ok(PortfolioReport {
        positions,
        totals,
        unresolved,
    })
}

fn overflow(what: &str) -> AnalyticsError {
    AnalyticsError::Overflow(what.to_string())
}

fn add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, AnalyticsError> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

fn mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal, AnalyticsError> {
    a.checked_mul(b).ok_or_else(|| overflow(what))
}

// num / den, or zero when den is zero
fn ratio(num: Decimal, den: Decimal, what: &str) -> Result<Decimal, AnalyticsError> {
    if den.is_zero() {
        return Ok(Decimal::ZERO);
    }
    num.checked_div(den).ok_or_else(|| overflow(what))
}

fn percent(num: Decimal, den: Decimal, what: &str) -> Result<Decimal, AnalyticsError> {
    mul(ratio(num, den, what)?, HUNDRED, what)
}
