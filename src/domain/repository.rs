use crate::domain::errors::StoreError;
use crate::domain::models::Transaction;
use async_trait::async_trait;

pub type RepoResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Append-only: there is no update or delete for ledger rows.
    // Returns the stored row with its assigned id.
    async fn append_transaction(&self, tx: &Transaction) -> RepoResult<Transaction>;
    // All rows for a user ordered by purchase date, then id
    async fn list_transactions(&self, user: &str) -> RepoResult<Vec<Transaction>>;
}

#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list_watchlist(&self, user: &str) -> RepoResult<Vec<String>>;
    // false when the ticker is already on the user's list
    async fn add_to_watchlist(&self, user: &str, ticker: &str) -> RepoResult<bool>;
    // false when there was nothing to remove
    async fn remove_from_watchlist(&self, user: &str, ticker: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    // false when the username is taken
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<bool>;
    async fn find_password_hash(&self, username: &str) -> RepoResult<Option<String>>;
}
