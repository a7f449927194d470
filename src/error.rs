// src/error.rs

//! Unified error handling for the sync application.

use std::fmt;

use thiserror::Error;

use crate::pipeline::SyncState;
use crate::storage::WriteSummary;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reaching the open data API failed (network, timeout or HTTP status)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The open data API answered with a payload we could not interpret
    #[error("Decode error for {context}: {message}")]
    Decode { context: String, message: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store connection or bootstrap failed
    #[error("Store error: {0}")]
    Store(String),

    /// The store rejected one or more operations of a bulk write
    #[error(
        "Write error: {failed} of {total} operations failed (objectIds {object_ids:?}), {} matched and {} inserted: {message}",
        .succeeded.matched,
        .succeeded.upserted
    )]
    Write {
        failed: usize,
        total: usize,
        object_ids: Vec<i64>,
        message: String,
        /// What the store did apply from the same batch
        succeeded: WriteSummary,
    },

    /// A sync run aborted
    #[error("Sync failed while {state} (batch {batch}): {source}")]
    Sync {
        state: SyncState,
        batch: usize,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Create a decode error with context.
    pub fn decode(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Wrap an error with the sync state and batch it happened in.
    pub fn sync(state: SyncState, batch: usize, source: AppError) -> Self {
        Self::Sync {
            state,
            batch,
            source: Box::new(source),
        }
    }

    /// The state a sync run was in when it failed, if this is a sync failure.
    pub fn failed_state(&self) -> Option<SyncState> {
        match self {
            Self::Sync { state, .. } => Some(*state),
            _ => None,
        }
    }
}

#[cfg(feature = "mongo")]
impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Store(e.to_string())
    }
}
