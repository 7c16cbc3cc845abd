use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use csv::{Reader, ReaderBuilder};
use rust_decimal::Decimal;
use std::env;
use std::fs::File;
use std::io::Read;
use stock_dashboard::config::AppConfig;
use stock_dashboard::domain::errors::{ServiceError, ValidationError};
use stock_dashboard::domain::models::{NewTransaction, Transaction};
use stock_dashboard::domain::repository::LedgerStore;
use stock_dashboard::infra::sqlite::repo::SqliteRepo;
use stock_dashboard::logging::init_logging;
use tracing::{info, warn};

// Amounts are read as text so no digits are lost on the way to the ledger
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    user: String,
    ticker: String,
    #[serde(with = "rust_decimal::serde::str")]
    shares: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    purchase_price: Decimal,
    purchase_date: NaiveDate,
}

fn csv_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(input)
}

/// Validates one imported row the same way the API validates a purchase.
fn row_to_transaction(row: CsvRow, today: NaiveDate) -> Result<Transaction, ValidationError> {
    let user = row.user.trim();
    if user.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    NewTransaction {
        ticker: row.ticker,
        shares: row.shares,
        purchase_price: row.purchase_price,
        purchase_date: row.purchase_date,
    }
    .validate(user, today)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    init_logging(&config.log_filter);

    let repo = SqliteRepo::connect(&config.database_url)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "transactions.csv".to_string());
    info!(path = %path, database = %config.database_url, "Importing transactions");

    let file = File::open(&path).with_context(|| format!("reading {}", path))?;
    let mut rdr = csv_reader(file);

    let today = Utc::now().date_naive();
    let mut inserted: usize = 0;
    let mut rejected: usize = 0;
    for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("row {}", line + 1))?;
        let stored = match row_to_transaction(row, today) {
            Ok(tx) => repo.append_transaction(&tx).await.map_err(ServiceError::from),
            Err(e) => Err(ServiceError::from(e)),
        };
        match stored {
            Ok(_) => inserted += 1,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Skipping row");
                rejected += 1;
            }
        }
    }
    info!(inserted, rejected, "Import finished");
    Ok(())
}
