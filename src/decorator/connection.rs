use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::datasource::{Connection, Row};
use crate::error::Result;
use crate::listener::{
    dispatch, ConnectionInfo, Event, ListenerRegistry, StatementInfo, StatementKind,
    StatementOutcome,
};

/// Connection proxy that notifies listeners around every lifecycle
/// operation.
///
/// Each operation fires its "before" event, delegates to the real
/// connection, then fires the "after" event with the elapsed time and the
/// real outcome. The real result, error included, is returned untouched.
pub struct DecoratedConnection {
    inner: Box<dyn Connection>,
    info: Arc<ConnectionInfo>,
    registry: Arc<ListenerRegistry>,
    closed: bool,
}

impl DecoratedConnection {
    pub fn new(
        inner: Box<dyn Connection>,
        info: Arc<ConnectionInfo>,
        registry: Arc<ListenerRegistry>,
    ) -> Self {
        Self {
            inner,
            info,
            registry,
            closed: false,
        }
    }

    fn notify(&self, event: Event<'_>) {
        dispatch(&event, &self.registry);
    }
}

#[async_trait]
impl Connection for DecoratedConnection {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let statement = StatementInfo::new(self.info.clone(), StatementKind::Execute, sql);
        self.notify(Event::BeforeExecute { statement: &statement });

        let started = Instant::now();
        let result = self.inner.execute(sql).await;

        self.notify(Event::AfterExecute {
            statement: &statement,
            elapsed: started.elapsed(),
            outcome: result.as_ref().ok().map(|n| StatementOutcome::RowsAffected(*n)),
            error: result.as_ref().err(),
        });
        result
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>> {
        let statement = StatementInfo::new(self.info.clone(), StatementKind::Query, sql);
        self.notify(Event::BeforeExecute { statement: &statement });

        let started = Instant::now();
        let result = self.inner.query(sql).await;

        self.notify(Event::AfterExecute {
            statement: &statement,
            elapsed: started.elapsed(),
            outcome: result
                .as_ref()
                .ok()
                .map(|rows| StatementOutcome::RowsReturned(rows.len())),
            error: result.as_ref().err(),
        });
        result
    }

    async fn execute_batch(&mut self, statements: &[&str]) -> Result<Vec<u64>> {
        let statement = StatementInfo::batch(self.info.clone(), statements);
        self.notify(Event::BeforeExecute { statement: &statement });

        let started = Instant::now();
        let result = self.inner.execute_batch(statements).await;

        self.notify(Event::AfterExecute {
            statement: &statement,
            elapsed: started.elapsed(),
            outcome: result
                .as_ref()
                .ok()
                .map(|counts| StatementOutcome::BatchAffected(counts.iter().sum())),
            error: result.as_ref().err(),
        });
        result
    }

    async fn begin(&mut self) -> Result<()> {
        self.inner.begin().await
    }

    async fn commit(&mut self) -> Result<()> {
        self.notify(Event::BeforeCommit { connection: &self.info });

        let started = Instant::now();
        let result = self.inner.commit().await;

        self.notify(Event::AfterCommit {
            connection: &self.info,
            elapsed: started.elapsed(),
            error: result.as_ref().err(),
        });
        result
    }

    async fn rollback(&mut self) -> Result<()> {
        self.notify(Event::BeforeRollback { connection: &self.info });

        let started = Instant::now();
        let result = self.inner.rollback().await;

        self.notify(Event::AfterRollback {
            connection: &self.info,
            elapsed: started.elapsed(),
            error: result.as_ref().err(),
        });
        result
    }

    /// Closes the real connection once. Later calls do nothing and fire no
    /// events.
    async fn close(&mut self) -> Result<()> {
        if self.closed {
            tracing::trace!(
                "Connection #{} already closed, ignoring close",
                self.info.connection_number
            );
            return Ok(());
        }
        self.closed = true;

        self.notify(Event::BeforeClose { connection: &self.info });

        let started = Instant::now();
        let result = self.inner.close().await;

        self.notify(Event::AfterClose {
            connection: &self.info,
            elapsed: started.elapsed(),
            error: result.as_ref().err(),
        });
        result
    }

    fn is_closed(&self) -> bool {
        self.closed || self.inner.is_closed()
    }

    fn is_decorated(&self) -> bool {
        true
    }

    fn connection_info(&self) -> Option<&Arc<ConnectionInfo>> {
        Some(&self.info)
    }
}
