mod common;

use std::sync::Arc;

use common::{counting_fixture, quiet_config};
use datasource_decorator::config::{DecorationSupport, DecoratorStrategy};
use datasource_decorator::datasource::DataSource;
use datasource_decorator::decorator::{decorate, DecoratorContext};
use datasource_decorator::listener::{EventKind, EventListener, ListenerRegistry};
use datasource_decorator::testing::{MockDataSource, RecordingListener};

#[tokio::test]
async fn test_decorating_twice_returns_same_proxy() {
    let recorder = Arc::new(RecordingListener::default());
    let listeners: Vec<Arc<dyn EventListener>> = vec![recorder.clone()];
    let registry = Arc::new(ListenerRegistry::new(listeners));

    let once = decorate(Arc::new(MockDataSource::new("primary")), registry.clone());
    let twice = decorate(once.clone(), registry);

    assert!(Arc::ptr_eq(&once, &twice));

    let mut conn = twice.get_connection().await.unwrap();
    conn.close().await.unwrap();

    assert_eq!(recorder.count(EventKind::ConnectionWrapped), 1);
    assert_eq!(recorder.count(EventKind::AfterClose), 1);
}

#[tokio::test]
async fn test_context_decoration_is_idempotent() {
    let context = DecoratorContext::new(quiet_config(), Vec::new());
    let once = context.decorate_data_source(Arc::new(MockDataSource::new("primary")));
    let twice = context.decorate_data_source(once.clone());

    assert!(once.is_decorated());
    assert!(Arc::ptr_eq(&once, &twice));
}

#[tokio::test]
async fn test_disabled_decoration_leaves_source_untouched() {
    let mut config = quiet_config();
    config.datasource.enabled = false;
    let fixture = counting_fixture(config);
    let source: Arc<dyn DataSource> = fixture.source.clone();

    assert!(Arc::ptr_eq(&fixture.decorated, &source));

    let mut conn = fixture.decorated.get_connection().await.unwrap();
    assert!(!conn.is_decorated());
    conn.close().await.unwrap();

    assert_eq!(fixture.wrapping.wrapped_count(), 0);
    assert_eq!(fixture.closing.closed_count(), 0);
    assert_eq!(fixture.source.state().closed(), 1);
}

#[tokio::test]
async fn test_unavailable_support_leaves_source_untouched() {
    let mut config = quiet_config();
    config.datasource.support = DecorationSupport::Unavailable;
    let fixture = counting_fixture(config);
    let source: Arc<dyn DataSource> = fixture.source.clone();

    assert!(Arc::ptr_eq(&fixture.decorated, &source));

    fixture.decorated.get_connection().await.unwrap();
    assert_eq!(fixture.wrapping.wrapped_count(), 0);
}

#[tokio::test]
async fn test_strategy_none_leaves_source_untouched() {
    let mut config = quiet_config();
    config.datasource.strategy = DecoratorStrategy::None;
    let fixture = counting_fixture(config);
    let source: Arc<dyn DataSource> = fixture.source.clone();

    assert!(Arc::ptr_eq(&fixture.decorated, &source));
    assert!(!fixture.decorated.is_decorated());
}

#[tokio::test]
async fn test_excluded_source_is_not_decorated() {
    let mut config = quiet_config();
    config.datasource.exclude = vec!["primary".to_string()];
    let fixture = counting_fixture(config);
    let source: Arc<dyn DataSource> = fixture.source.clone();

    assert!(Arc::ptr_eq(&fixture.decorated, &source));

    fixture.decorated.get_connection().await.unwrap();
    assert_eq!(fixture.wrapping.wrapped_count(), 0);
}

#[test]
fn test_metadata_is_unchanged_by_decoration() {
    let fixture = counting_fixture(quiet_config());

    let metadata = fixture.decorated.metadata();
    assert_eq!(metadata, fixture.source.metadata());
    assert_eq!(metadata.name, "primary");
    assert_eq!(metadata.database_type, "Mock");
    assert_eq!(metadata.max_connections, Some(8));
}

#[tokio::test]
async fn test_decoration_opens_no_connection() {
    let fixture = counting_fixture(quiet_config());

    assert!(fixture.decorated.is_decorated());
    assert_eq!(fixture.source.state().acquired(), 0);
    assert_eq!(fixture.wrapping.wrapped_count(), 0);
}

#[tokio::test]
async fn test_failed_acquisition_wraps_nothing() {
    let fixture = counting_fixture(quiet_config());
    fixture.source.state().fail_acquire("too many clients");

    let error = fixture.decorated.get_connection().await.err().unwrap();

    assert_eq!(error.to_string(), "Failed to acquire connection: too many clients");
    assert_eq!(fixture.wrapping.wrapped_count(), 0);
    assert_eq!(fixture.closing.closed_count(), 0);
}

#[tokio::test]
async fn test_real_data_source_bypasses_listeners() {
    let fixture = counting_fixture(quiet_config());

    let real = fixture.decorated.real_data_source().unwrap().clone();
    let source: Arc<dyn DataSource> = fixture.source.clone();
    assert!(Arc::ptr_eq(&real, &source));

    let mut raw = real.get_connection().await.unwrap();
    raw.close().await.unwrap();
    assert_eq!(fixture.wrapping.wrapped_count(), 0);
    assert_eq!(fixture.closing.closed_count(), 0);

    let mut conn = fixture.decorated.get_connection().await.unwrap();
    assert_eq!(fixture.wrapping.wrapped_count(), 1);
    assert_eq!(fixture.closing.closed_count(), 0);

    conn.close().await.unwrap();
    assert_eq!(fixture.wrapping.wrapped_count(), 1);
    assert_eq!(fixture.closing.closed_count(), 1);
    assert_eq!(fixture.source.state().closed(), 2);
}
