use crate::domain::errors::StoreError;
use crate::domain::models::Transaction;
use crate::domain::repository::{LedgerStore, RepoResult, UserStore, WatchlistStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

pub struct SqliteRepo {
    pub pool: SqlitePool,
}

// Ledger row as stored: decimals are kept as text
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    username: String,
    ticker: String,
    shares: String,
    purchase_price: String,
    purchase_date: NaiveDate,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let parse = |field: &str, text: &str| {
            Decimal::from_str(text).map_err(|e| {
                StoreError::Corrupt(format!("transaction {} {} '{}': {}", row.id, field, text, e))
            })
        };
        Ok(Transaction {
            id: Some(row.id),
            shares: parse("shares", &row.shares)?,
            purchase_price: parse("purchase_price", &row.purchase_price)?,
            user: row.username,
            ticker: row.ticker,
            purchase_date: row.purchase_date,
        })
    }
}

impl SqliteRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies migrations.
    pub async fn connect(url: &str) -> RepoResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database; a single connection so every query sees the same data.
    pub async fn in_memory() -> RepoResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl LedgerStore for SqliteRepo {
    async fn append_transaction(&self, tx: &Transaction) -> RepoResult<Transaction> {
        let result = sqlx::query(
            "INSERT INTO transactions (username, ticker, shares, purchase_price, purchase_date) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&tx.user)
        .bind(&tx.ticker)
        .bind(tx.shares.to_string())
        .bind(tx.purchase_price.to_string())
        .bind(tx.purchase_date)
        .execute(&self.pool)
        .await?;
        Ok(Transaction {
            id: Some(result.last_insert_rowid()),
            ..tx.clone()
        })
    }

    async fn list_transactions(&self, user: &str) -> RepoResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, username, ticker, shares, purchase_price, purchase_date FROM transactions WHERE username = ?1 ORDER BY purchase_date ASC, id ASC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[async_trait]
impl WatchlistStore for SqliteRepo {
    async fn list_watchlist(&self, user: &str) -> RepoResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT ticker FROM watchlist WHERE username = ?1 ORDER BY id ASC")
                .bind(user)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    async fn add_to_watchlist(&self, user: &str, ticker: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO watchlist (username, ticker) VALUES (?1, ?2)")
                .bind(user)
                .bind(ticker)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_from_watchlist(&self, user: &str, ticker: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE username = ?1 AND ticker = ?2")
            .bind(user)
            .bind(ticker)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for SqliteRepo {
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO users (username, password_hash) VALUES (?1, ?2)")
                .bind(username)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_password_hash(&self, username: &str) -> RepoResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE username = ?1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(h,)| h))
    }
}
