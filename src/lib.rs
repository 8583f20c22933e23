//! Transparent data source decoration.
//!
//! [`decorator::decorate`] wraps a [`datasource::DataSource`] so that every
//! connection it hands out reports acquisition, statement execution,
//! commit/rollback and close to an ordered [`listener::ListenerRegistry`],
//! while behaving exactly like the undecorated connection.
//!
//! ```rust,ignore
//! use datasource_decorator::prelude::*;
//!
//! let context = DecoratorContext::new(DecoratorConfig::from_env(), vec![]);
//! let source = PgDataSource::from_env("primary", &context.config().database).await?;
//! let source = context.decorate_data_source(Arc::new(source));
//!
//! let mut conn = source.get_connection().await?;
//! conn.execute("UPDATE accounts SET active = true").await?;
//! conn.close().await?;
//! ```

pub mod cli;
pub mod config;
pub mod datasource;
pub mod decorator;
pub mod error;
pub mod listener;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod prelude {
    pub use crate::config::{DecorationSupport, DecoratorConfig, DecoratorStrategy};
    pub use crate::datasource::{Connection, DataSource, DataSourceMetadata, PgDataSource, Row};
    pub use crate::decorator::{decorate, DecoratedConnection, DecoratedDataSource, DecoratorContext};
    pub use crate::error::{DataSourceError, ListenerError, ListenerResult, Result};
    pub use crate::listener::{
        dispatch, ConnectionInfo, Event, EventKind, EventListener, ListenerRegistry,
        LoggingListener, QueryCountListener, SlowQueryListener, StatementInfo, StatementKind,
        StatementOutcome,
    };
    pub use std::sync::Arc;
}

pub use error::{DataSourceError, Result};
