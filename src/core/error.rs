/// MultiDb Error Module
///
/// This module defines the error type shared by the driver layer, the
/// connection registry, configuration loading and the command-line front end.
use thiserror::Error;

/// Error type for every fallible operation in the crate.
///
/// Failures are always reported as values:
/// - Driver errors (opening files, preparing and stepping statements)
/// - Connect failures, tagged with the connection identifier
/// - Query failures surfaced by `get_assoc` and `count`
/// - Unknown connection identifiers and a missing primary selection
/// - Configuration loading and output encoding
#[derive(Error, Debug)]
pub enum MultiDbError {
    /// Errors reported by the SQLite driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The driver could not establish a connection
    #[error("Connection failed for '{connection_id}': {message}")]
    Connect {
        connection_id: String,
        message: String,
    },

    /// A statement was rejected or returned something unusable
    #[error("Query error: {0}")]
    Query(String),

    /// The identifier was never registered, or has been closed
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// No identifier given and no primary connection selected
    #[error("No primary connection selected")]
    NoPrimary,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MultiDbError {
    /// Wraps a driver error raised while connecting.
    pub fn connect(connection_id: impl Into<String>, source: impl std::fmt::Display) -> Self {
        MultiDbError::Connect {
            connection_id: connection_id.into(),
            message: source.to_string(),
        }
    }
}

/// Type alias for Result to use MultiDbError as the error type.
pub type Result<T> = std::result::Result<T, MultiDbError>;
