// Connectivity SPI: data sources hand out connections, connections run SQL
// and manage their own transaction and close lifecycle.

pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::listener::ConnectionInfo;

pub use postgres::{PgConnection, PgDataSource};

/// A result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Descriptive information a data source exposes about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceMetadata {
    /// Logical name, used for exclusion checks and in every event.
    pub name: String,
    pub database_type: String,
    /// Connection URL with credentials redacted
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

impl DataSourceMetadata {
    pub fn new(name: impl Into<String>, database_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_type: database_type.into(),
            url: None,
            max_connections: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = Some(max_connections);
        self
    }
}

/// A single database connection.
///
/// Connections are driven by one task at a time, hence `&mut self`.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement that modifies data, returns affected row count
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Execute a statement that returns rows
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Execute statements in order, returns affected counts per statement.
    /// Stops at the first failure.
    async fn execute_batch(&mut self, statements: &[&str]) -> Result<Vec<u64>> {
        let mut results = Vec::with_capacity(statements.len());
        for sql in statements {
            results.push(self.execute(sql).await?);
        }
        Ok(results)
    }

    /// Start a transaction
    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Release the connection. Closing a closed connection is a no-op.
    async fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// True for connections produced by a decorated data source
    fn is_decorated(&self) -> bool {
        false
    }

    /// Identity shared with listeners, for decorated connections only
    fn connection_info(&self) -> Option<&Arc<ConnectionInfo>> {
        None
    }
}

/// A connectivity provider.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Acquire a connection
    async fn get_connection(&self) -> Result<Box<dyn Connection>>;

    fn metadata(&self) -> DataSourceMetadata;

    /// True for data sources produced by [`crate::decorator::decorate`]
    fn is_decorated(&self) -> bool {
        false
    }

    /// The undecorated data source behind a decorated one
    fn real_data_source(&self) -> Option<&Arc<dyn DataSource>> {
        None
    }
}
