// Per-event fan-out over the listener registry

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::error::ListenerResult;
use crate::listener::event::Event;
use crate::listener::registry::ListenerRegistry;
use crate::listener::traits::EventListener;

/// Counts from one dispatch call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners whose handler ran to completion, successfully or not
    pub invoked: usize,
    /// Listeners not interested in the event kind
    pub skipped: usize,
    /// Listeners whose handler returned an error or panicked
    pub failed: usize,
}

/// Deliver `event` to every interested listener in registration order.
///
/// Listener failures are logged and swallowed: a failing listener neither
/// stops the remaining listeners nor reaches the caller.
pub fn dispatch(event: &Event<'_>, registry: &ListenerRegistry) -> DispatchReport {
    let kind = event.kind();
    let mut report = DispatchReport::default();

    for listener in registry.all() {
        if !listener.is_interested(kind) {
            tracing::trace!("Listener {} skipped - not interested in {:?}", listener.name(), kind);
            report.skipped += 1;
            continue;
        }

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| deliver(event, listener.as_ref())));
        report.invoked += 1;

        match result {
            Ok(Ok(())) => {
                tracing::trace!(
                    "Listener {} handled {:?} in {:?}",
                    listener.name(),
                    kind,
                    started.elapsed()
                );
            }
            Ok(Err(error)) => {
                tracing::warn!("Listener {} failed on {:?}: {}", listener.name(), kind, error);
                report.failed += 1;
            }
            Err(payload) => {
                tracing::error!(
                    "Listener {} panicked on {:?}: {}",
                    listener.name(),
                    kind,
                    panic_message(payload.as_ref())
                );
                report.failed += 1;
            }
        }
    }

    report
}

fn deliver(event: &Event<'_>, listener: &dyn EventListener) -> ListenerResult {
    match *event {
        Event::BeforeGetConnection { data_source } => listener.on_before_get_connection(data_source),
        Event::AfterGetConnection {
            data_source,
            connection,
            elapsed,
            error,
        } => listener.on_after_get_connection(data_source, connection, elapsed, error),
        Event::ConnectionWrapped { connection } => listener.on_connection_wrapped(connection),
        Event::BeforeExecute { statement } => listener.on_before_execute(statement),
        Event::AfterExecute {
            statement,
            elapsed,
            outcome,
            error,
        } => listener.on_after_execute(statement, elapsed, outcome, error),
        Event::BeforeCommit { connection } => listener.on_before_commit(connection),
        Event::AfterCommit {
            connection,
            elapsed,
            error,
        } => listener.on_after_commit(connection, elapsed, error),
        Event::BeforeRollback { connection } => listener.on_before_rollback(connection),
        Event::AfterRollback {
            connection,
            elapsed,
            error,
        } => listener.on_after_rollback(connection, elapsed, error),
        Event::BeforeClose { connection } => listener.on_before_connection_close(connection),
        Event::AfterClose {
            connection,
            elapsed,
            error,
        } => listener.on_after_connection_close(connection, elapsed, error),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::listener::event::{ConnectionInfo, EventKind};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl EventListener for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    struct Failing;

    impl EventListener for Failing {
        fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
            Err(ListenerError::failed("failing", "boom"))
        }
    }

    struct Panicking;

    impl EventListener for Panicking {
        fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
            panic!("listener exploded");
        }
    }

    struct CloseOnly;

    impl EventListener for CloseOnly {
        fn is_interested(&self, kind: EventKind) -> bool {
            kind == EventKind::AfterClose
        }
    }

    #[test]
    fn test_dispatch_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new(vec![
            Arc::new(Recorder { name: "a", log: log.clone() }),
            Arc::new(Recorder { name: "b", log: log.clone() }),
            Arc::new(Recorder { name: "c", log: log.clone() }),
        ]);
        let conn = ConnectionInfo::new("primary", 1);

        let report = dispatch(&Event::ConnectionWrapped { connection: &conn }, &registry);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(report, DispatchReport { invoked: 3, skipped: 0, failed: 0 });
    }

    #[test]
    fn test_failures_do_not_stop_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new(vec![
            Arc::new(Failing),
            Arc::new(Panicking),
            Arc::new(Recorder { name: "last", log: log.clone() }),
        ]);
        let conn = ConnectionInfo::new("primary", 1);

        let report = dispatch(&Event::ConnectionWrapped { connection: &conn }, &registry);

        assert_eq!(*log.lock().unwrap(), vec!["last"]);
        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed, 2);
    }

    #[test]
    fn test_uninterested_listeners_are_skipped() {
        let registry = ListenerRegistry::new(vec![Arc::new(CloseOnly)]);
        let conn = ConnectionInfo::new("primary", 1);

        let report = dispatch(&Event::BeforeClose { connection: &conn }, &registry);
        assert_eq!(report, DispatchReport { invoked: 0, skipped: 1, failed: 0 });

        let report = dispatch(
            &Event::AfterClose {
                connection: &conn,
                elapsed: std::time::Duration::ZERO,
                error: None,
            },
            &registry,
        );
        assert_eq!(report.invoked, 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
