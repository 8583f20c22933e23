// Data source and listener error types
use thiserror::Error;

/// Errors raised by a data source or one of its connections.
///
/// Decorated connections hand these back to the caller exactly as the real
/// connection produced them.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Failed to acquire connection: {0}")]
    Acquire(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DataSourceError {
    pub fn acquire(message: impl Into<String>) -> Self {
        DataSourceError::Acquire(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        DataSourceError::Query(message.into())
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        DataSourceError::Transaction(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

/// Failure reported by a listener handler. Never propagated to callers of
/// the decorated surface; the dispatch loop logs it and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("Listener '{listener}' failed: {message}")]
    Failed { listener: String, message: String },
}

impl ListenerError {
    pub fn failed(listener: impl Into<String>, message: impl Into<String>) -> Self {
        ListenerError::Failed {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

pub type ListenerResult = std::result::Result<(), ListenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(DataSourceError::ConnectionClosed.to_string(), "Connection is closed");
        assert_eq!(
            DataSourceError::query("syntax error at or near \"SELEC\"").to_string(),
            "Query error: syntax error at or near \"SELEC\""
        );
        assert_eq!(
            ListenerError::failed("audit", "disk full").to_string(),
            "Listener 'audit' failed: disk full"
        );
    }
}
