// PostgreSQL data source backed by a sqlx connection pool

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, Executor, PgPool, Postgres, Row as _, TypeInfo};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::datasource::{Connection, DataSource, DataSourceMetadata, Row};
use crate::error::{DataSourceError, Result};

/// Data source handing out pooled PostgreSQL connections.
///
/// Pool sizing and health checks stay with sqlx; this type only adapts the
/// pool to the [`DataSource`] surface.
pub struct PgDataSource {
    name: String,
    pool: PgPool,
    url: Option<String>,
    max_connections: Option<u32>,
}

impl PgDataSource {
    /// Wrap an existing pool
    pub fn new(name: impl Into<String>, pool: PgPool) -> Self {
        Self {
            name: name.into(),
            pool,
            url: None,
            max_connections: None,
        }
    }

    /// Create a pool for `url` and wrap it
    pub async fn connect(
        name: impl Into<String>,
        url: &str,
        config: &DatabaseConfig,
    ) -> Result<Self> {
        let redacted = redact_url(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        let mut source = Self::new(name, pool);
        info!("Created database pool for data source: {}", source.name);

        source.url = Some(redacted);
        source.max_connections = Some(config.max_connections);
        Ok(source)
    }

    /// Connect using DATABASE_URL
    pub async fn from_env(name: impl Into<String>, config: &DatabaseConfig) -> Result<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DataSourceError::ConfigMissing("DATABASE_URL"))?;
        Self::connect(name, &url, config).await
    }
}

#[async_trait]
impl DataSource for PgDataSource {
    async fn get_connection(&self) -> Result<Box<dyn Connection>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PgConnection::new(conn)))
    }

    fn metadata(&self) -> DataSourceMetadata {
        let mut metadata = DataSourceMetadata::new(&self.name, "PostgreSQL");
        if let Some(url) = &self.url {
            metadata = metadata.with_url(url);
        }
        if let Some(max_connections) = self.max_connections {
            metadata = metadata.with_max_connections(max_connections);
        }
        metadata
    }
}

/// A pooled PostgreSQL connection. Closing returns it to the pool.
///
/// A transaction still open at close is rolled back first. If that rollback
/// fails, or the connection is dropped mid-transaction, the connection is
/// detached from the pool instead of being handed to the next caller.
pub struct PgConnection {
    conn: Option<PoolConnection<Postgres>>,
    in_transaction: bool,
}

impl PgConnection {
    fn new(conn: PoolConnection<Postgres>) -> Self {
        Self {
            conn: Some(conn),
            in_transaction: false,
        }
    }

    fn live(&mut self) -> Result<&mut PoolConnection<Postgres>> {
        self.conn.as_mut().ok_or(DataSourceError::ConnectionClosed)
    }

    async fn end_transaction(&mut self, command: &str) -> Result<()> {
        let conn = self.live()?;
        (&mut **conn)
            .execute(command)
            .await
            .map_err(|e| DataSourceError::transaction(e.to_string()))?;
        self.in_transaction = false;
        Ok(())
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        if let Some(conn) = self.conn.take() {
            warn!("Connection dropped inside a transaction, detaching it from the pool");
            drop(conn.detach());
        }
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let conn = self.live()?;
        let result = sqlx::query(sql).execute(&mut **conn).await?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.live()?;
        let rows = sqlx::query(sql).fetch_all(&mut **conn).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn begin(&mut self) -> Result<()> {
        let conn = self.live()?;
        (&mut **conn)
            .execute("BEGIN")
            .await
            .map_err(|e| DataSourceError::transaction(e.to_string()))?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.end_transaction("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.end_transaction("ROLLBACK").await
    }

    async fn close(&mut self) -> Result<()> {
        if self.conn.is_none() {
            return Ok(());
        }

        let rolled_back = if self.in_transaction {
            warn!("Closing connection with an open transaction, rolling back");
            self.end_transaction("ROLLBACK").await
        } else {
            Ok(())
        };

        if let Some(conn) = self.conn.take() {
            if rolled_back.is_err() {
                // Transaction state unknown, keep it out of the pool
                drop(conn.detach());
            }
            // Otherwise dropping the pool connection hands it back to the pool
        }
        self.in_transaction = false;
        rolled_back
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}

/// Replace the password in a connection URL so it can be logged
pub fn redact_url(url: &str) -> Result<String> {
    let mut parsed = url::Url::parse(url).map_err(|_| DataSourceError::InvalidDatabaseUrl)?;
    if parsed.password().is_some() {
        parsed
            .set_password(Some("***"))
            .map_err(|_| DataSourceError::InvalidDatabaseUrl)?;
    }
    Ok(parsed.to_string())
}

fn row_to_json(row: &PgRow) -> Row {
    let mut record = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        record.insert(column.name().to_string(), column_value(row, i, column.type_info().name()));
    }
    record
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .and_then(|n| Number::from_f64(f64::from(n)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
