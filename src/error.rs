//! Error types for the mapper.
//!
//! This module defines all error types using `thiserror`. Connection and
//! database variants carry a suggestion that tells the caller what to check.

use crate::db::IsolationLevel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Record '{record}' does not match its declared shape: {message}")]
    ShapeMismatch { record: String, message: String },

    #[error("Mapping error for '{record}': {message}")]
    Mapping { record: String, message: String },

    /// Work inside a transaction failed and the transaction was rolled back.
    #[error("Transaction failed at {isolation} and was rolled back: {source}")]
    TransactionFailure {
        isolation: IsolationLevel,
        #[source]
        source: Box<DbError>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a shape mismatch error for a record type.
    pub fn shape_mismatch(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error for a record type.
    pub fn mapping(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            record: record.into(),
            message: message.into(),
        }
    }

    /// Wrap the error raised by transactional work.
    pub fn transaction_failure(isolation: IsolationLevel, source: DbError) -> Self {
        Self::TransactionFailure {
            isolation,
            source: Box::new(source),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::TransactionFailure { source, .. } => source.suggestion(),
            _ => None,
        }
    }

    /// The error raised by the transactional work, if this is a transaction failure.
    pub fn work_error(&self) -> Option<&DbError> {
        match self {
            Self::TransactionFailure { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Unwrap a transaction failure into the work's own error.
    pub fn into_work_error(self) -> DbError {
        match self {
            Self::TransactionFailure { source, .. } => *source,
            other => other,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only classifies; nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::TransactionFailure { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::mapping(col.clone(), format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
