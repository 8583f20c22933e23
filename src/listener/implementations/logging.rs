// Statement logging listener
//
// One log line per completed statement, commit, rollback and close, written
// through tracing under the `datasource_decorator::spy` target.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{DataSourceError, ListenerResult};
use crate::listener::event::{
    ConnectionInfo, EventKind, StatementInfo, StatementKind, StatementOutcome,
};
use crate::listener::traits::EventListener;

pub const SPY_TARGET: &str = "datasource_decorator::spy";

#[derive(Debug, Clone, Default)]
pub struct LoggingListener {
    multiline: bool,
}

impl LoggingListener {
    pub fn new(multiline: bool) -> Self {
        Self { multiline }
    }

    /// Render one log line.
    ///
    /// Single-line mode collapses all whitespace in the SQL so a statement
    /// never spans several log records.
    pub fn format_line(
        &self,
        connection: &ConnectionInfo,
        elapsed: Duration,
        category: &str,
        sql: Option<&str>,
    ) -> String {
        let header = format!(
            "#{} | took {}ms | {} | connection {}",
            connection.connection_number,
            elapsed.as_millis(),
            category,
            connection.data_source
        );

        match sql {
            None => header,
            Some(sql) if self.multiline => format!("{}\n{}", header, sql.trim()),
            Some(sql) => {
                let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("{} | {}", header, flat)
            }
        }
    }

    fn log(&self, line: String, error: Option<&DataSourceError>) {
        match error {
            None => tracing::info!(target: SPY_TARGET, "{}", line),
            Some(error) => tracing::warn!(target: SPY_TARGET, "{} | error: {}", line, error),
        }
    }
}

fn statement_category(kind: StatementKind) -> &'static str {
    match kind {
        StatementKind::Execute => "statement",
        StatementKind::Query => "query",
        StatementKind::Batch => "batch",
    }
}

impl EventListener for LoggingListener {
    fn name(&self) -> &str {
        "LoggingListener"
    }

    fn is_interested(&self, kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::AfterExecute
                | EventKind::AfterCommit
                | EventKind::AfterRollback
                | EventKind::AfterClose
        )
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        _outcome: Option<StatementOutcome>,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        let line = self.format_line(
            &statement.connection,
            elapsed,
            statement_category(statement.kind),
            Some(statement.sql.as_str()),
        );
        self.log(line, error);
        Ok(())
    }

    fn on_after_commit(
        &self,
        connection: &Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.log(self.format_line(connection, elapsed, "commit", None), error);
        Ok(())
    }

    fn on_after_rollback(
        &self,
        connection: &Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.log(self.format_line(connection, elapsed, "rollback", None), error);
        Ok(())
    }

    fn on_after_connection_close(
        &self,
        connection: &Arc<ConnectionInfo>,
        elapsed: Duration,
        error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.log(self.format_line(connection, elapsed, "close", None), error);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_format() {
        let listener = LoggingListener::new(false);
        let conn = ConnectionInfo::new("primary", 4);

        let line = listener.format_line(
            &conn,
            Duration::from_millis(12),
            "query",
            Some("SELECT id,\n       name\n  FROM users"),
        );

        assert_eq!(
            line,
            "#4 | took 12ms | query | connection primary | SELECT id, name FROM users"
        );
    }

    #[test]
    fn test_multiline_format_keeps_sql_layout() {
        let listener = LoggingListener::new(true);
        let conn = ConnectionInfo::new("primary", 1);

        let line = listener.format_line(&conn, Duration::ZERO, "statement", Some("UPDATE t\nSET a = 1\n"));

        assert_eq!(line, "#1 | took 0ms | statement | connection primary\nUPDATE t\nSET a = 1");
    }

    #[test]
    fn test_interest_is_limited_to_after_events() {
        let listener = LoggingListener::default();

        assert!(listener.is_interested(EventKind::AfterExecute));
        assert!(listener.is_interested(EventKind::AfterClose));
        assert!(!listener.is_interested(EventKind::BeforeExecute));
        assert!(!listener.is_interested(EventKind::ConnectionWrapped));
    }
}
