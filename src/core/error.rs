//! Error types and error handling for the metaportal core.
//!
//! Every failure surfaced by the index engine, the session cache,
//! cursors, the alias table or the integrity checker is one of the
//! typed variants below. Adapters (the CLI) map them to exit codes
//! and messages.

use thiserror::Error;

/// Result type alias for metaportal operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Main error type for the metaportal core
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index '{location}': {message}")]
    OpenFailed { location: String, message: String },

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Stale session: {0}")]
    StaleSession(String),

    #[error("Result index {index} out of range (size {size})")]
    OutOfRange { index: usize, size: usize },

    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Repair of index '{location}' failed: {message}")]
    RepairFailed { location: String, message: String },

    #[error("Target index not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid query field '{field}': {message}")]
    InvalidQueryField {
        field: String,
        message: String,
        valid_fields: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("Index in use: {0}")]
    IndexInUse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl IndexError {
    /// Shorthand for an open failure at `location`
    pub fn open_failed(location: &str, message: impl std::fmt::Display) -> Self {
        IndexError::OpenFailed {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::TargetNotFound(_))
    }

    /// Check if this is a conflict error (index currently in service)
    pub fn is_conflict(&self) -> bool {
        matches!(self, IndexError::IndexInUse(_))
    }

    /// Check if this is a bad request error (caller bug or invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            IndexError::InvalidQuery(_)
                | IndexError::InvalidQueryField { .. }
                | IndexError::OutOfRange { .. }
                | IndexError::ConfigError(_)
        )
    }

    /// Check if the caller may retry the same request.
    ///
    /// Only stale sessions qualify: a retry re-executes the query
    /// against whatever the alias resolves to now.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::StaleSession(_))
    }
}
