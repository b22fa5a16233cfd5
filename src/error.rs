//! Unified error type for the hit counter.
//!
//! Every fallible operation in this crate returns [`Result`], so a host can
//! handle provisioning, configuration and persistence failures through a
//! single error type.
//!
//! Only [`Error::AssetLoad`] and [`Error::Config`] are meant to stop a host
//! from starting. Persistence errors are reported so they can be logged,
//! but the counter keeps serving hits when they occur.
//!
//! # Example
//!
//! ```rust
//! use hitcounter::{DisplayConfig, Error};
//!
//! let err = DisplayConfig::from_directives("colour red").unwrap_err();
//! assert!(matches!(err, Error::Config(_)));
//! ```

use thiserror::Error;

use crate::config::Style;

/// Unified error type for all hit counter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A glyph image for the configured style is missing or unreadable.
    #[error("unable to load digit {digit} for style {style}: {source}")]
    AssetLoad {
        /// The style being loaded.
        style: Style,
        /// The digit whose asset failed.
        digit: u8,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid display configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The snapshot exists but could not be read back.
    #[error("restoring hit counters: {0}")]
    PersistenceRead(#[source] SnapshotError),

    /// The snapshot could not be written.
    #[error("persisting hit counters: {0}")]
    PersistenceWrite(#[source] SnapshotError),
}

/// Result type for hit counter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type specific to snapshot storage.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Error reading or writing the snapshot file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not valid JSON or has the wrong shape.
    #[error("format error: {0}")]
    Format(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
