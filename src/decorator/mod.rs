// Data source decoration: wraps a data source so every connection it hands
// out reports its lifecycle to the registered listeners.

pub mod connection;
pub mod context;

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::datasource::{Connection, DataSource, DataSourceMetadata};
use crate::error::Result;
use crate::listener::{dispatch, ConnectionInfo, Event, ListenerRegistry};

pub use connection::DecoratedConnection;
pub use context::DecoratorContext;

/// Wrap `provider` so its connections notify `registry`.
///
/// A provider that is already decorated comes back as-is (same `Arc`), so
/// decorating twice never nests proxies. No connection is opened here.
pub fn decorate(provider: Arc<dyn DataSource>, registry: Arc<ListenerRegistry>) -> Arc<dyn DataSource> {
    if provider.is_decorated() {
        tracing::debug!(
            "Data source '{}' is already decorated, skipping",
            provider.metadata().name
        );
        return provider;
    }

    Arc::new(DecoratedDataSource::new(provider, registry))
}

/// Data source proxy produced by [`decorate`].
pub struct DecoratedDataSource {
    real: Arc<dyn DataSource>,
    registry: Arc<ListenerRegistry>,
    name: String,
    connection_counter: AtomicU64,
}

impl DecoratedDataSource {
    fn new(real: Arc<dyn DataSource>, registry: Arc<ListenerRegistry>) -> Self {
        let name = real.metadata().name;
        tracing::debug!(
            "Decorating data source '{}' with {} listeners",
            name,
            registry.len()
        );

        Self {
            real,
            registry,
            name,
            connection_counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl DataSource for DecoratedDataSource {
    async fn get_connection(&self) -> Result<Box<dyn Connection>> {
        dispatch(&Event::BeforeGetConnection { data_source: &self.name }, &self.registry);

        let started = Instant::now();
        let connection = match self.real.get_connection().await {
            Ok(connection) => connection,
            Err(error) => {
                dispatch(
                    &Event::AfterGetConnection {
                        data_source: &self.name,
                        connection: None,
                        elapsed: started.elapsed(),
                        error: Some(&error),
                    },
                    &self.registry,
                );
                return Err(error);
            }
        };
        let elapsed = started.elapsed();

        // A real data source handing out decorated connections already has
        // its own listeners attached
        if connection.is_decorated() {
            tracing::debug!(
                "Data source '{}' returned a decorated connection, not wrapping again",
                self.name
            );
            dispatch(
                &Event::AfterGetConnection {
                    data_source: &self.name,
                    connection: None,
                    elapsed,
                    error: None,
                },
                &self.registry,
            );
            return Ok(connection);
        }

        let number = self.connection_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let info = ConnectionInfo::new(&self.name, number);

        dispatch(
            &Event::AfterGetConnection {
                data_source: &self.name,
                connection: Some(&info),
                elapsed,
                error: None,
            },
            &self.registry,
        );
        dispatch(&Event::ConnectionWrapped { connection: &info }, &self.registry);

        Ok(Box::new(DecoratedConnection::new(
            connection,
            info,
            self.registry.clone(),
        )))
    }

    fn metadata(&self) -> DataSourceMetadata {
        self.real.metadata()
    }

    fn is_decorated(&self) -> bool {
        true
    }

    fn real_data_source(&self) -> Option<&Arc<dyn DataSource>> {
        Some(&self.real)
    }
}
