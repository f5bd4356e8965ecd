//! Error types for skywatch.
//!
//! This module defines all error types used throughout the skywatch crate.
//! Fetch errors are transient and surface only through the live view state;
//! cache errors are always recovered inside the cache layer.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for skywatch operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    /// Failed to open or create the cache database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A cache record could not be read or written.
    #[error("cache I/O failed for '{key}': {message}")]
    CacheIo {
        /// The cache key involved.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Live Data Errors ===
    /// A data source fetch failed (network, HTTP status, decoding).
    #[error("fetch from {source_name} failed: {message}")]
    Fetch {
        /// Name of the data source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// No batch has ever been obtained for the live view.
    #[error("no data available")]
    NoData,

    /// A region with an impossible bounding box was constructed.
    #[error("invalid region: north ({north}) must be greater than south ({south})")]
    InvalidRegion {
        /// Northern bound.
        north: f64,
        /// Southern bound.
        south: f64,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for skywatch operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new fetch error for the named data source.
    #[must_use]
    pub fn fetch(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name,
            message: message.into(),
        }
    }

    /// Create a new cache I/O error.
    #[must_use]
    pub fn cache_io(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CacheIo {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a fetch failure that the next trigger may recover.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Timeout { .. })
    }
}
