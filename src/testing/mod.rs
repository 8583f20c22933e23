// In-memory data source and recording listener for exercising decoration
// without a database.

use async_trait::async_trait;
use serde_json::{json, Map};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::datasource::{Connection, DataSource, DataSourceMetadata, Row};
use crate::error::{DataSourceError, ListenerResult, Result};
use crate::listener::{ConnectionInfo, EventKind, EventListener, StatementInfo, StatementOutcome};

/// Shared state of a [`MockDataSource`] and every connection it handed out.
#[derive(Debug, Default)]
pub struct MockState {
    acquired: AtomicUsize,
    closed: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    statements: Mutex<Vec<String>>,
    acquire_error: Mutex<Option<String>>,
    close_error: Mutex<Option<String>>,
    failing_sql: Mutex<Option<String>>,
}

impl MockState {
    /// Connections acquired from the data source
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Real closes performed on mock connections
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    /// SQL received by mock connections, in order
    pub fn statements(&self) -> Vec<String> {
        lock(&self.statements).clone()
    }

    /// Make every later acquisition fail
    pub fn fail_acquire(&self, message: &str) {
        *lock(&self.acquire_error) = Some(message.to_string());
    }

    /// Make every later real close fail (after releasing the connection)
    pub fn fail_close(&self, message: &str) {
        *lock(&self.close_error) = Some(message.to_string());
    }

    /// Make statements containing `fragment` fail
    pub fn fail_sql_containing(&self, fragment: &str) {
        *lock(&self.failing_sql) = Some(fragment.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MockDataSource {
    name: String,
    state: Arc<MockState>,
}

impl MockDataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(MockState::default()),
        }
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn get_connection(&self) -> Result<Box<dyn Connection>> {
        if let Some(message) = lock(&self.state.acquire_error).clone() {
            return Err(DataSourceError::acquire(message));
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
            closed: false,
        }))
    }

    fn metadata(&self) -> DataSourceMetadata {
        DataSourceMetadata::new(&self.name, "Mock").with_max_connections(8)
    }
}

pub struct MockConnection {
    state: Arc<MockState>,
    closed: bool,
}

impl MockConnection {
    fn run(&mut self, sql: &str) -> Result<()> {
        if self.closed {
            return Err(DataSourceError::ConnectionClosed);
        }
        lock(&self.state.statements).push(sql.to_string());

        let failing = lock(&self.state.failing_sql).clone();
        match failing {
            Some(fragment) if sql.contains(&fragment) => {
                Err(DataSourceError::query(format!("statement rejected: {}", sql)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.run(sql)?;
        Ok(1)
    }

    /// Returns a single row echoing the SQL
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.run(sql)?;
        let mut row = Map::new();
        row.insert("sql".to_string(), json!(sql));
        Ok(vec![row])
    }

    async fn begin(&mut self) -> Result<()> {
        self.run("BEGIN")
    }

    async fn commit(&mut self) -> Result<()> {
        self.run("COMMIT")?;
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run("ROLLBACK")?;
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.state.closed.fetch_add(1, Ordering::SeqCst);

        match lock(&self.state.close_error).clone() {
            Some(message) => Err(DataSourceError::query(message)),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// One notification seen by a [`RecordingListener`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub connection_number: Option<u64>,
    pub sql: Option<String>,
    pub outcome: Option<StatementOutcome>,
    pub error: Option<String>,
}

impl RecordedEvent {
    fn new(kind: EventKind, connection: Option<&Arc<ConnectionInfo>>) -> Self {
        Self {
            kind,
            connection_number: connection.map(|c| c.connection_number),
            sql: None,
            outcome: None,
            error: None,
        }
    }

    fn with_error(mut self, error: Option<&DataSourceError>) -> Self {
        self.error = error.map(|e| e.to_string());
        self
    }
}

/// Listener that records every event it receives
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<RecordedEvent> {
        lock(&self.events).clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        lock(&self.events).iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        lock(&self.events).iter().filter(|e| e.kind == kind).count()
    }

    /// Connection numbers from ConnectionWrapped events
    pub fn connection_numbers(&self) -> Vec<u64> {
        lock(&self.events)
            .iter()
            .filter(|e| e.kind == EventKind::ConnectionWrapped)
            .filter_map(|e| e.connection_number)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.events).iter().filter_map(|e| e.error.clone()).collect()
    }

    fn record(&self, event: RecordedEvent) -> ListenerResult {
        lock(&self.events).push(event);
        Ok(())
    }
}

impl EventListener for RecordingListener {
    fn name(&self) -> &str {
        "RecordingListener"
    }

    fn on_before_get_connection(&self, _data_source: &str) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::BeforeGetConnection, None))
    }

    fn on_after_get_connection(
        &self,
        _data_source: &str,
        connection: Option<&Arc<ConnectionInfo>>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::AfterGetConnection, connection).with_error(error))
    }

    fn on_connection_wrapped(&self, connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::ConnectionWrapped, Some(connection)))
    }

    fn on_before_execute(&self, statement: &StatementInfo) -> ListenerResult {
        let mut event = RecordedEvent::new(EventKind::BeforeExecute, Some(&statement.connection));
        event.sql = Some(statement.sql.clone());
        self.record(event)
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        _elapsed: Duration,
        outcome: Option<StatementOutcome>,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        let mut event =
            RecordedEvent::new(EventKind::AfterExecute, Some(&statement.connection)).with_error(error);
        event.sql = Some(statement.sql.clone());
        event.outcome = outcome;
        self.record(event)
    }

    fn on_before_commit(&self, connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::BeforeCommit, Some(connection)))
    }

    fn on_after_commit(
        &self,
        connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::AfterCommit, Some(connection)).with_error(error))
    }

    fn on_before_rollback(&self, connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::BeforeRollback, Some(connection)))
    }

    fn on_after_rollback(
        &self,
        connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::AfterRollback, Some(connection)).with_error(error))
    }

    fn on_before_connection_close(&self, connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::BeforeClose, Some(connection)))
    }

    fn on_after_connection_close(
        &self,
        connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.record(RecordedEvent::new(EventKind::AfterClose, Some(connection)).with_error(error))
    }
}
