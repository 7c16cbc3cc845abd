use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global fmt subscriber. `RUST_LOG` wins over `fallback_filter`.
pub fn init_logging(fallback_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (tests, repeated binaries in one process) is not an error
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
