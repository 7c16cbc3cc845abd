use dotenv::dotenv;
use std::env;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/dashboard.db";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PRICE_DATA_DIR: &str = "data/prices";
pub const DEFAULT_MARKET_INDEX: &str = "^GSPC";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub price_data_dir: String,
    /// Benchmark ticker for beta.
    pub market_index: String,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            port,
            price_data_dir: get("PRICE_DATA_DIR", DEFAULT_PRICE_DATA_DIR),
            market_index: get("MARKET_INDEX", DEFAULT_MARKET_INDEX),
            log_filter: get("LOG_FILTER", "info"),
        })
    }
}
