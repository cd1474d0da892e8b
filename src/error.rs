//! Error types for the certificados gateway.
//!
//! All database failures funnel into [`DbError`] so the executor can classify
//! them and the HTTP layer can surface driver code/message pairs to callers.

use thiserror::Error;

use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;

#[derive(Error, Debug)]
pub enum DbError {
    /// The physical link to the server is unusable (I/O, TLS, protocol, or
    /// the pool reporting itself closed).
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// The server accepted the statement and rejected it. Carries the
    /// SQLSTATE when the driver reports one.
    #[error("query failed: {message}")]
    Query {
        message: String,
        sql_state: Option<String>,
    },

    #[error("{operation} timed out after {elapsed_secs}s")]
    Timeout { operation: String, elapsed_secs: u64 },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with an optional SQLSTATE.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// SQLSTATE reported by the driver, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// The raw message without the variant prefix, for response bodies.
    pub fn message(&self) -> String {
        match self {
            Self::Connection { message } => message.clone(),
            Self::Query { message, .. } => message.clone(),
            Self::Timeout {
                operation,
                elapsed_secs,
            } => format!("{operation} timed out after {elapsed_secs}s"),
            Self::Internal { message } => message.clone(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let sql_state = db_err.code().map(|c| c.to_string());
                DbError::query(db_err.message(), sql_state)
            }
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {io_err}")),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {tls_err}")),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("protocol error: {msg}")),
            sqlx::Error::PoolClosed => DbError::connection("connection pool is closed"),
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection acquire", DEFAULT_ACQUIRE_TIMEOUT_SECS)
            }
            sqlx::Error::WorkerCrashed => DbError::connection("database worker crashed"),
            sqlx::Error::RowNotFound => DbError::query("no rows returned", None),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("failed to decode column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("decode error: {source}")),
            _ => DbError::internal(format!("unexpected database error: {err}")),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("socket reset by peer");
        assert!(err.to_string().contains("connection failed"));
    }

    #[test]
    fn test_message_strips_prefix() {
        let err = DbError::query("Unknown column 'curp'", Some("42S22".to_string()));
        assert_eq!(err.message(), "Unknown column 'curp'");
        assert_eq!(err.sql_state(), Some("42S22"));
    }

    #[test]
    fn test_connection_has_no_sql_state() {
        let err = DbError::connection("broken pipe");
        assert_eq!(err.sql_state(), None);
    }

    #[test]
    fn test_from_sqlx_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: DbError = sqlx::Error::Io(io).into();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_from_sqlx_pool_closed() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_from_sqlx_pool_timed_out() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::Timeout { .. }));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Query { sql_state: None, .. }));
    }
}
