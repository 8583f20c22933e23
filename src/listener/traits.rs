use std::sync::Arc;
use std::time::Duration;

use crate::error::{DataSourceError, ListenerResult};
use crate::listener::event::{ConnectionInfo, EventKind, StatementInfo, StatementOutcome};

/// Observer of data source and connection lifecycle events.
///
/// Every handler defaults to a no-op, so an implementation overrides only
/// the events it cares about. `is_interested` lets the dispatch loop skip a
/// listener entirely for a kind of event.
///
/// Handlers run synchronously on the task driving the connection. A handler
/// returning `Err` (or panicking) is logged and ignored; it never changes
/// the outcome of the decorated operation.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use datasource_decorator::error::ListenerResult;
/// use datasource_decorator::listener::{ConnectionInfo, EventListener};
///
/// #[derive(Default)]
/// struct WrappingCounter(AtomicUsize);
///
/// impl EventListener for WrappingCounter {
///     fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
pub trait EventListener: Send + Sync {
    /// Listener name for logging and debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn is_interested(&self, _kind: EventKind) -> bool {
        true
    }

    fn on_before_get_connection(&self, _data_source: &str) -> ListenerResult {
        Ok(())
    }

    /// `connection` is `None` when acquisition failed, or when the real data
    /// source handed out an already decorated connection that is returned
    /// without a new wrapper
    fn on_after_get_connection(
        &self,
        _data_source: &str,
        _connection: Option<&Arc<ConnectionInfo>>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        Ok(())
    }

    fn on_before_execute(&self, _statement: &StatementInfo) -> ListenerResult {
        Ok(())
    }

    fn on_after_execute(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _outcome: Option<StatementOutcome>,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_before_commit(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        Ok(())
    }

    fn on_after_commit(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_before_rollback(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        Ok(())
    }

    fn on_after_rollback(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_before_connection_close(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        Ok(())
    }

    fn on_after_connection_close(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        Ok(())
    }
}
