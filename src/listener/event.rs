use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::DataSourceError;

/// Identity of one physical connection, shared by every event fired for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: Uuid,
    /// Sequential number within the originating data source, starting at 1
    pub connection_number: u64,
    /// Name of the data source that produced the connection
    pub data_source: String,
    pub created_at: DateTime<Utc>,
}

impl ConnectionInfo {
    pub fn new(data_source: impl Into<String>, connection_number: u64) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            connection_number,
            data_source: data_source.into(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Execute,
    Query,
    Batch,
}

/// A statement about to run (or having run) on a connection.
#[derive(Debug, Clone)]
pub struct StatementInfo {
    pub connection: Arc<ConnectionInfo>,
    pub kind: StatementKind,
    /// SQL text; batches join their statements with `;\n`
    pub sql: String,
    /// The individual statements, a single entry unless `kind` is `Batch`
    pub statements: Vec<String>,
}

impl StatementInfo {
    pub fn new(connection: Arc<ConnectionInfo>, kind: StatementKind, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            connection,
            kind,
            statements: vec![sql.clone()],
            sql,
        }
    }

    pub fn batch(connection: Arc<ConnectionInfo>, statements: &[&str]) -> Self {
        Self {
            connection,
            kind: StatementKind::Batch,
            sql: statements.join(";\n"),
            statements: statements.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What a successful statement produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    RowsAffected(u64),
    RowsReturned(usize),
    /// Sum of affected rows over every statement in the batch
    BatchAffected(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeGetConnection,
    AfterGetConnection,
    ConnectionWrapped,
    BeforeExecute,
    AfterExecute,
    BeforeCommit,
    AfterCommit,
    BeforeRollback,
    AfterRollback,
    BeforeClose,
    AfterClose,
}

impl EventKind {
    pub const ALL: [EventKind; 11] = [
        EventKind::BeforeGetConnection,
        EventKind::AfterGetConnection,
        EventKind::ConnectionWrapped,
        EventKind::BeforeExecute,
        EventKind::AfterExecute,
        EventKind::BeforeCommit,
        EventKind::AfterCommit,
        EventKind::BeforeRollback,
        EventKind::AfterRollback,
        EventKind::BeforeClose,
        EventKind::AfterClose,
    ];

    pub fn is_before(&self) -> bool {
        matches!(
            self,
            EventKind::BeforeGetConnection
                | EventKind::BeforeExecute
                | EventKind::BeforeCommit
                | EventKind::BeforeRollback
                | EventKind::BeforeClose
        )
    }
}

/// A lifecycle event. Borrowed payloads, lives only for one dispatch.
///
/// "After" events fire whether or not the real operation succeeded and carry
/// its error, if any.
#[derive(Debug)]
pub enum Event<'a> {
    BeforeGetConnection {
        data_source: &'a str,
    },
    AfterGetConnection {
        data_source: &'a str,
        connection: Option<&'a Arc<ConnectionInfo>>,
        elapsed: Duration,
        error: Option<&'a DataSourceError>,
    },
    ConnectionWrapped {
        connection: &'a Arc<ConnectionInfo>,
    },
    BeforeExecute {
        statement: &'a StatementInfo,
    },
    AfterExecute {
        statement: &'a StatementInfo,
        elapsed: Duration,
        outcome: Option<StatementOutcome>,
        error: Option<&'a DataSourceError>,
    },
    BeforeCommit {
        connection: &'a Arc<ConnectionInfo>,
    },
    AfterCommit {
        connection: &'a Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&'a DataSourceError>,
    },
    BeforeRollback {
        connection: &'a Arc<ConnectionInfo>,
    },
    AfterRollback {
        connection: &'a Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&'a DataSourceError>,
    },
    BeforeClose {
        connection: &'a Arc<ConnectionInfo>,
    },
    AfterClose {
        connection: &'a Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&'a DataSourceError>,
    },
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BeforeGetConnection { .. } => EventKind::BeforeGetConnection,
            Event::AfterGetConnection { .. } => EventKind::AfterGetConnection,
            Event::ConnectionWrapped { .. } => EventKind::ConnectionWrapped,
            Event::BeforeExecute { .. } => EventKind::BeforeExecute,
            Event::AfterExecute { .. } => EventKind::AfterExecute,
            Event::BeforeCommit { .. } => EventKind::BeforeCommit,
            Event::AfterCommit { .. } => EventKind::AfterCommit,
            Event::BeforeRollback { .. } => EventKind::BeforeRollback,
            Event::AfterRollback { .. } => EventKind::AfterRollback,
            Event::BeforeClose { .. } => EventKind::BeforeClose,
            Event::AfterClose { .. } => EventKind::AfterClose,
        }
    }

    /// The connection the event concerns, if one exists yet
    pub fn connection(&self) -> Option<&Arc<ConnectionInfo>> {
        match self {
            Event::BeforeGetConnection { .. } => None,
            Event::AfterGetConnection { connection, .. } => *connection,
            Event::BeforeExecute { statement } | Event::AfterExecute { statement, .. } => {
                Some(&statement.connection)
            }
            Event::ConnectionWrapped { connection }
            | Event::BeforeCommit { connection }
            | Event::AfterCommit { connection, .. }
            | Event::BeforeRollback { connection }
            | Event::AfterRollback { connection, .. }
            | Event::BeforeClose { connection }
            | Event::AfterClose { connection, .. } => Some(*connection),
        }
    }
}
