pub mod config;
pub mod error;

pub use config::{Config, FeedConfig, StoreConfig, ValidationResult};
pub use error::{
    AppError, ConfigError, FeedError, ReqwestErrorExt, RusqliteErrorExt, StorageError,
};

use anyhow::Result;

/// Initialize logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!("tenki core initialized");
    Ok(())
}
