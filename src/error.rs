//! Error types for docwire
//!
//! Provides a unified error type for all driver operations.

use thiserror::Error;

/// Result type alias using DriverError
pub type Result<T> = std::result::Result<T, DriverError>;

/// Unified error type for docwire operations
#[derive(Debug, Error)]
pub enum DriverError {
    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    /// A byte buffer could not be parsed as a document
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// A document that cannot be put on the wire
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Reply framing or header inconsistent with the outstanding request
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// Any transport-level failure, carrying the original cause
    #[error("Connection failure: {context}: {source}")]
    ConnectionFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    /// The server no longer knows the cursor we asked more results for
    #[error("Cursor {cursor_id} is no longer valid on the server")]
    CursorInvalidated { cursor_id: i64 },

    /// The server reported a query or command failure
    #[error("Command failed: {0}")]
    CommandFailure(String),

    // -------------------------------------------------------------------------
    // Value Access Errors
    // -------------------------------------------------------------------------
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Type mismatch for '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriverError {
    /// Wrap a transport error with a description of what was being attempted
    pub fn connection(context: impl Into<String>, source: std::io::Error) -> Self {
        DriverError::ConnectionFailure {
            context: context.into(),
            source,
        }
    }

    /// True for failures that should trigger failover
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, DriverError::ConnectionFailure { .. })
    }
}

impl From<std::io::Error> for DriverError {
    fn from(source: std::io::Error) -> Self {
        DriverError::connection("I/O error", source)
    }
}
