// Flags statements whose execution time reaches a threshold

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{DataSourceError, ListenerResult};
use crate::listener::event::{EventKind, StatementInfo, StatementOutcome};
use crate::listener::traits::EventListener;

#[derive(Debug)]
pub struct SlowQueryListener {
    threshold: Duration,
    slow_count: AtomicU64,
}

impl SlowQueryListener {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            slow_count: AtomicU64::new(0),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Number of statements flagged so far
    pub fn slow_count(&self) -> u64 {
        self.slow_count.load(Ordering::Relaxed)
    }
}

impl EventListener for SlowQueryListener {
    fn name(&self) -> &str {
        "SlowQueryListener"
    }

    fn is_interested(&self, kind: EventKind) -> bool {
        kind == EventKind::AfterExecute
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        _outcome: Option<StatementOutcome>,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        if elapsed >= self.threshold {
            self.slow_count.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                "Slow query on connection #{} ({}): took {:?}, threshold {:?}: {}",
                statement.connection.connection_number,
                statement.connection.data_source,
                elapsed,
                self.threshold,
                statement.sql
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::event::{ConnectionInfo, StatementKind};

    #[test]
    fn test_flags_statements_at_or_over_threshold() {
        let listener = SlowQueryListener::new(Duration::from_millis(100));
        let statement = StatementInfo::new(
            ConnectionInfo::new("primary", 1),
            StatementKind::Query,
            "SELECT pg_sleep(1)",
        );

        listener
            .on_after_execute(&statement, Duration::from_millis(99), None, None)
            .unwrap();
        assert_eq!(listener.slow_count(), 0);

        listener
            .on_after_execute(&statement, Duration::from_millis(100), None, None)
            .unwrap();
        listener
            .on_after_execute(&statement, Duration::from_secs(2), None, None)
            .unwrap();
        assert_eq!(listener.slow_count(), 2);
    }
}
