//! Error types for lightbox-db

use thiserror::Error;

/// Result type alias for statement rendering and execution.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised while rendering or executing statements.
///
/// Driver failures are recorded on the [`Database`](crate::Database) instance rather than
/// returned from `execute`/`query`; the driver variants below exist so those failures can be
/// classified and logged.
#[derive(Debug, Error)]
pub enum DbError {
    /// Builder misuse (missing fields, empty SET list, pagination without a sort, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller asserted a row count that the result set did not match
    #[error("Unexpected row count: expected {expected}, got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a row-count mismatch error
    pub fn unexpected_row_count(expected: usize, actual: usize) -> Self {
        Self::UnexpectedRowCount { expected, actual }
    }

    /// Check if this is builder misuse
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// A row-count assertion found no rows at all.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnexpectedRowCount { actual: 0, .. })
    }

    /// A row-count assertion found more rows than expected.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::UnexpectedRowCount { expected, actual } if actual > expected)
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific DbError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

/// Unrecoverable startup errors: bad configuration or an unreachable data source.
///
/// Not convertible into [`DbError`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested data source key is not configured
    #[error("Unknown data source '{0}'")]
    UnknownSource(String),

    /// The driver failed to open the connection
    #[error("Connection to data source '{source_key}' failed: {error}")]
    Connect {
        source_key: String,
        #[source]
        error: tokio_postgres::Error,
    },

    /// The unit of work could not be started on a fresh connection
    #[error("Could not begin transaction on data source '{source_key}': {message}")]
    Begin { source_key: String, message: String },
}

impl ConnectError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_helpers() {
        assert!(DbError::unexpected_row_count(1, 0).is_not_found());
        assert!(!DbError::unexpected_row_count(1, 0).is_ambiguous());
        assert!(DbError::unexpected_row_count(1, 3).is_ambiguous());
        assert!(!DbError::unexpected_row_count(2, 1).is_not_found());
        assert!(!DbError::unexpected_row_count(2, 1).is_ambiguous());
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            DbError::unexpected_row_count(1, 2).to_string(),
            "Unexpected row count: expected 1, got 2"
        );
        assert_eq!(
            DbError::invalid_argument("no fields").to_string(),
            "Invalid argument: no fields"
        );
        assert_eq!(
            ConnectError::UnknownSource("stock".into()).to_string(),
            "Unknown data source 'stock'"
        );
    }
}
