//! Error types for state persistence.
//!
//! This module defines [`PersistError`], the error type returned by
//! storage media, codecs and settings loading, and a [`Result`] alias.
//!
//! # Error Handling Strategy
//!
//! - Media and codecs return `PersistError` so callers can match on quota
//!   and availability problems
//! - The enhancer wraps read-side faults in [`PersistError::Recovery`] and
//!   write-side faults in [`PersistError::Persistence`], logs them, and
//!   never lets them escape store construction or a change notification
//! - Use `anyhow::Error` (via `PersistError::Other`) for custom media

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Reading or decoding the persisted blob failed.
    #[error("Failed to recover persisted state under '{key}': {source}")]
    Recovery {
        key: String,
        #[source]
        source: Box<PersistError>,
    },

    /// Encoding or writing the state subset failed.
    #[error("Failed to persist state under '{key}': {source}")]
    Persistence {
        key: String,
        #[source]
        source: Box<PersistError>,
    },

    /// The encoded value does not fit the medium's size limit.
    #[error("Value for '{key}' is {size} bytes, exceeding the {limit} byte limit")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    /// A lifetime that cannot be represented as a point in time.
    #[error("max_age of {max_age} seconds is out of range")]
    ExpiryOutOfRange { max_age: i64 },

    /// The medium cannot be reached at all.
    #[error("Storage medium unavailable: {message}")]
    MediumUnavailable { message: String },

    /// Structured-text encode or decode failure.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Failed to load or parse a settings file.
    #[error("Invalid persist settings at {path}: {message}")]
    Settings { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PersistError {
    /// Wrap a read-side error as a recovery failure for `key`.
    pub fn recovery(key: impl Into<String>, source: PersistError) -> Self {
        Self::Recovery {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a write-side error as a persistence failure for `key`.
    pub fn persistence(key: impl Into<String>, source: PersistError) -> Self {
        Self::Persistence {
            key: key.into(),
            source: Box::new(source),
        }
    }

    /// Shorthand for [`PersistError::MediumUnavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::MediumUnavailable {
            message: message.into(),
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;
