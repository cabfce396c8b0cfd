//! Core error types for aura-core.
//!
//! Errors are grouped by the boundary they come from: the snapshot store,
//! the TOML configuration, and the task-ingestion planner. Missing
//! identifiers are not errors at all; mutations simply return `None`.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for aura-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Snapshot store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task ingestion errors
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another writer
    #[error("Database is locked")]
    Locked,

    /// The store refused the write (used by in-memory stores)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors raised at the language-model ingestion boundary.
///
/// None of these ever leave a partially applied batch behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No API key configured
    #[error("No planner API key configured")]
    MissingKey,

    /// The remote service rejected the credentials
    #[error("Planner rejected the API key")]
    AuthInvalid,

    /// The remote service is throttling requests
    #[error("Planner rate limit reached")]
    RateLimited,

    /// The request never produced an HTTP response
    #[error("Planner request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status other than auth/rate-limit
    #[error("Planner returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Response did not match the expected task schema
    #[error("Malformed planner payload: {0}")]
    MalformedPayload(String),
}

impl IngestError {
    /// Short message suitable for a transient banner.
    pub fn user_message(&self) -> &'static str {
        match self {
            IngestError::MissingKey => "Neural key missing. Check Settings.",
            IngestError::AuthInvalid => "Neural key rejected. Check Settings.",
            IngestError::RateLimited => "Too many requests. Try again shortly.",
            IngestError::Transport(_) | IngestError::Remote { .. } => "Action failed.",
            IngestError::MalformedPayload(_) => "Could not understand the plan.",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_errors_map_to_banner_text() {
        assert_eq!(
            IngestError::MissingKey.user_message(),
            "Neural key missing. Check Settings."
        );
        assert_eq!(
            IngestError::Remote { status: 500, message: "boom".into() }.user_message(),
            "Action failed."
        );
    }

    #[test]
    fn store_error_converts_into_core_error() {
        let err: CoreError = StoreError::Locked.into();
        assert_eq!(err.to_string(), "Store error: Database is locked");
    }
}
