//! Centralized error types for tenki.
//!
//! The taxonomy has two recoverable conditions that callers must be able to
//! tell apart:
//! - [`FeedError`]: the upstream feed is unavailable (timeout, connection
//!   failure, non-2xx status, unparseable body)
//! - [`StorageError`]: the local snapshot database is unavailable
//!
//! Missing or short fields inside an otherwise valid feed document are not
//! errors at all; the normalizer reports them as absent values.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for display.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(#[from] FeedError),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::FeedUnavailable(e) => e.user_message(),
            AppError::StorageUnavailable(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether trying the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::FeedUnavailable(_) | AppError::StorageUnavailable(_)
        )
    }
}

/// The forecast feed could not deliver a usable document.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FeedError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FeedError::ConnectionFailed(_) => {
                "Unable to reach the forecast service. Check your internet connection."
            }
            FeedError::Timeout => "The forecast service timed out. Please try again.",
            FeedError::ServerError { status, .. } if *status >= 500 => {
                "The forecast service is experiencing issues. Please try again later."
            }
            FeedError::ServerError { .. } => "The forecast request failed. Please try again.",
            FeedError::InvalidResponse(_) => {
                "Received an unexpected forecast response. Please try again."
            }
        }
    }
}

/// The snapshot database could not be opened, read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ConnectionFailed(_) => {
                "Unable to open the forecast history. Check the data directory."
            }
            StorageError::QueryFailed(_) => "Reading the forecast history failed. Please try again.",
            StorageError::WriteFailed(_) => {
                "Saving the forecast failed. Earlier forecasts are unaffected."
            }
            StorageError::Corruption(_) => {
                "The forecast history may be corrupted. Consider resetting the data directory."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "No configuration location found. Pass a config file path.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_feed_error(self) -> FeedError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_feed_error(self) -> FeedError {
        if self.is_timeout() {
            FeedError::Timeout
        } else if self.is_connect() {
            FeedError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            FeedError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() || self.is_body() {
            FeedError::InvalidResponse(self.to_string())
        } else {
            FeedError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                StorageError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::CannotOpen
                        | rusqlite::ErrorCode::NotADatabase
                        | rusqlite::ErrorCode::PermissionDenied
                ) =>
            {
                StorageError::ConnectionFailed(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::DatabaseCorrupt =>
            {
                StorageError::Corruption(self.to_string())
            }
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}
