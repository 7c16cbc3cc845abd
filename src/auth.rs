//! Username / password accounts.
//!
//! Passwords are stored as a single unsalted SHA-256 hex digest. This is a
//! convenience login for a personal dashboard, not a security boundary.

use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::errors::{ServiceResult, ValidationError};
use crate::domain::repository::UserStore;

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Registers a user. `Ok(false)` when the username is already taken.
pub async fn create_user(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> ServiceResult<bool> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername.into());
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword.into());
    }
    let created = store.create_user(username, &hash_password(password)).await?;
    info!(username, created, "Signup");
    Ok(created)
}

/// True when `username` exists and `password` hashes to the stored digest.
pub async fn check_password(
    store: &dyn UserStore,
    username: &str,
    password: &str,
) -> ServiceResult<bool> {
    let stored = store.find_password_hash(username.trim()).await?;
    Ok(stored.is_some_and(|h| h == hash_password(password)))
}
