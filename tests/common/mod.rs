#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use datasource_decorator::config::DecoratorConfig;
use datasource_decorator::datasource::DataSource;
use datasource_decorator::decorator::DecoratorContext;
use datasource_decorator::error::{DataSourceError, ListenerError, ListenerResult};
use datasource_decorator::listener::{ConnectionInfo, EventKind, EventListener};
use datasource_decorator::testing::MockDataSource;

/// Counts ConnectionWrapped notifications
#[derive(Default)]
pub struct WrappingCountingListener {
    wrapped: AtomicUsize,
}

impl WrappingCountingListener {
    pub fn wrapped_count(&self) -> usize {
        self.wrapped.load(Ordering::SeqCst)
    }
}

impl EventListener for WrappingCountingListener {
    fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts AfterClose notifications
#[derive(Default)]
pub struct ClosingCountingListener {
    closed: AtomicUsize,
}

impl ClosingCountingListener {
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl EventListener for ClosingCountingListener {
    fn is_interested(&self, kind: EventKind) -> bool {
        kind == EventKind::AfterClose
    }

    fn on_after_connection_close(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails (by error or by panic) on BeforeClose
pub struct FailingCloseListener {
    pub panic: bool,
}

impl EventListener for FailingCloseListener {
    fn name(&self) -> &str {
        "FailingCloseListener"
    }

    fn on_before_connection_close(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        if self.panic {
            panic!("listener blew up before close");
        }
        Err(ListenerError::failed("FailingCloseListener", "refusing close"))
    }
}

/// Appends its tag to a shared log for every event it sees
pub struct TaggingListener {
    pub tag: &'static str,
    pub log: Arc<Mutex<Vec<(&'static str, EventKind)>>>,
}

impl TaggingListener {
    fn push(&self, kind: EventKind) -> ListenerResult {
        self.log.lock().unwrap().push((self.tag, kind));
        Ok(())
    }
}

impl EventListener for TaggingListener {
    fn on_connection_wrapped(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.push(EventKind::ConnectionWrapped)
    }

    fn on_before_connection_close(&self, _connection: &Arc<ConnectionInfo>) -> ListenerResult {
        self.push(EventKind::BeforeClose)
    }

    fn on_after_connection_close(
        &self,
        _connection: &Arc<ConnectionInfo>,
        _elapsed: Duration,
        _error: Option<&DataSourceError>,
    ) -> ListenerResult {
        self.push(EventKind::AfterClose)
    }
}

/// Configuration with the built-in listeners switched off, so tests see
/// only the listeners they register
pub fn quiet_config() -> DecoratorConfig {
    let mut config = DecoratorConfig::default();
    config.listeners.logging_enabled = false;
    config.listeners.slow_query_enabled = false;
    config.listeners.query_count_enabled = false;
    config
}

pub struct Fixture {
    pub wrapping: Arc<WrappingCountingListener>,
    pub closing: Arc<ClosingCountingListener>,
    pub source: Arc<MockDataSource>,
    pub decorated: Arc<dyn DataSource>,
}

/// Mock data source decorated with the wrapping and closing counters
pub fn counting_fixture(config: DecoratorConfig) -> Fixture {
    let wrapping = Arc::new(WrappingCountingListener::default());
    let closing = Arc::new(ClosingCountingListener::default());
    let listeners: Vec<Arc<dyn EventListener>> = vec![wrapping.clone(), closing.clone()];
    let context = DecoratorContext::new(config, listeners);

    let source = Arc::new(MockDataSource::new("primary"));
    let decorated = context.decorate_data_source(source.clone());

    Fixture {
        wrapping,
        closing,
        source,
        decorated,
    }
}
