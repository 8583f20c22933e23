// Counts statements by type plus transaction outcomes

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DataSourceError, ListenerResult};
use crate::listener::event::{ConnectionInfo, EventKind, StatementInfo, StatementKind, StatementOutcome};
use crate::listener::traits::EventListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl QueryType {
    /// Classify a statement by its leading keyword. `WITH` queries count as
    /// selects.
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();

        match keyword.as_str() {
            "SELECT" | "WITH" | "VALUES" | "SHOW" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            _ => QueryType::Other,
        }
    }
}

/// Snapshot of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryCount {
    pub select: u64,
    pub insert: u64,
    pub update: u64,
    pub delete: u64,
    pub other: u64,
    pub batches: u64,
    pub success: u64,
    pub failure: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub connections: u64,
    pub closed: u64,
    pub elapsed_ms: u64,
}

impl QueryCount {
    pub fn total(&self) -> u64 {
        self.select + self.insert + self.update + self.delete + self.other
    }

    fn record_type(&mut self, query_type: QueryType) {
        match query_type {
            QueryType::Select => self.select += 1,
            QueryType::Insert => self.insert += 1,
            QueryType::Update => self.update += 1,
            QueryType::Delete => self.delete += 1,
            QueryType::Other => self.other += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct QueryCountListener {
    counts: Mutex<QueryCount>,
}

impl QueryCountListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> QueryCount {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = QueryCount::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueryCount> {
        // Poisoned by a panicking handler; counters stay usable
        self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventListener for QueryCountListener {
    fn name(&self) -> &str {
        "QueryCountListener"
    }

    fn is_interested(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::ConnectionWrapped
                | EventKind::AfterExecute
                | EventKind::AfterCommit
                | EventKind::AfterRollback
                | EventKind::AfterClose
        )
    }

    fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.lock().connections += 1;
        Ok(())
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        _outcome: Option<StatementOutcome>,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        let mut counts = self.lock();

        if statement.kind == StatementKind::Batch {
            counts.batches += 1;
        }
        for sql in &statement.statements {
            counts.record_type(QueryType::classify(sql));
        }

        if error.is_some() {
            counts.failure += 1;
        } else {
            counts.success += 1;
        }
        counts.elapsed_ms += elapsed.as_millis() as u64;
        Ok(())
    }

    fn on_after_commit(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        if error.is_none() {
            self.lock().commits += 1;
        }
        Ok(())
    }

    fn on_after_rollback(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        if error.is_none() {
            self.lock().rollbacks += 1;
        }
        Ok(())
    }

    fn on_after_connection_close(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.lock().closed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(QueryType::classify("  select 1"), QueryType::Select);
        assert_eq!(QueryType::classify("(SELECT 1) UNION (SELECT 2)"), QueryType::Select);
        assert_eq!(QueryType::classify("WITH x AS (SELECT 1) SELECT * FROM x"), QueryType::Select);
        assert_eq!(QueryType::classify("INSERT INTO t VALUES (1)"), QueryType::Insert);
        assert_eq!(QueryType::classify("update t set a = 1"), QueryType::Update);
        assert_eq!(QueryType::classify("DELETE FROM t"), QueryType::Delete);
        assert_eq!(QueryType::classify("CREATE TABLE t (id int)"), QueryType::Other);
        assert_eq!(QueryType::classify(""), QueryType::Other);
    }

    #[test]
    fn test_counts_statements_and_outcomes() {
        let listener = QueryCountListener::new();
        let conn = ConnectionInfo::new("primary", 1);

        listener.on_connection_wrapped(&conn).unwrap();
        let select = StatementInfo::new(conn.clone(), StatementKind::Query, "SELECT 1");
        listener
            .on_after_execute(&select, Duration::from_millis(5), Some(StatementOutcome::RowsReturned(1)), None)
            .unwrap();

        let failed = StatementInfo::new(conn.clone(), StatementKind::Execute, "UPDATE t SET a = 1");
        let error = DataSourceError::query("relation \"t\" does not exist");
        listener
            .on_after_execute(&failed, Duration::from_millis(1), None, Some(&error))
            .unwrap();

        let batch = StatementInfo::batch(conn.clone(), &["INSERT INTO a VALUES (1)", "DELETE FROM b"]);
        listener
            .on_after_execute(&batch, Duration::ZERO, Some(StatementOutcome::BatchAffected(2)), None)
            .unwrap();

        listener.on_after_commit(&conn, Duration::ZERO, None).unwrap();
        listener.on_after_connection_close(&conn, Duration::ZERO, None).unwrap();

        let counts = listener.snapshot();
        assert_eq!(counts.select, 1);
        assert_eq!(counts.update, 1);
        assert_eq!(counts.insert, 1);
        assert_eq!(counts.delete, 1);
        assert_eq!(counts.total(), 4);
        assert_eq!(counts.batches, 1);
        assert_eq!(counts.success, 2);
        assert_eq!(counts.failure, 1);
        assert_eq!(counts.commits, 1);
        assert_eq!(counts.connections, 1);
        assert_eq!(counts.closed, 1);
        assert_eq!(counts.elapsed_ms, 6);

        listener.reset();
        assert_eq!(listener.snapshot(), QueryCount::default());
    }

    #[test]
    fn test_batch_elements_with_embedded_separators_count_once() {
        let listener = QueryCountListener::new();
        let conn = ConnectionInfo::new("primary", 1);

        let batch = StatementInfo::batch(
            conn,
            &["UPDATE t SET a = 1", "DO $$ BEGIN\n  PERFORM 1;\nEND $$"],
        );
        listener
            .on_after_execute(&batch, Duration::ZERO, Some(StatementOutcome::BatchAffected(1)), None)
            .unwrap();

        let counts = listener.snapshot();
        assert_eq!(counts.update, 1);
        assert_eq!(counts.other, 1);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.batches, 1);
    }
}
