// Startup wiring: configuration plus externally resolved listeners become
// one immutable registry, applied to data sources by name.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{DecoratorConfig, DecoratorStrategy};
use crate::datasource::DataSource;
use crate::decorator::decorate;
use crate::listener::{
    EventListener, ListenerRegistry, LoggingListener, QueryCountListener, SlowQueryListener,
};

pub struct DecoratorContext {
    config: DecoratorConfig,
    registry: Arc<ListenerRegistry>,
    query_counts: Option<Arc<QueryCountListener>>,
    slow_queries: Option<Arc<SlowQueryListener>>,
}

impl DecoratorContext {
    /// Build the registry: `listeners` first, in the order given, followed
    /// by the built-in listeners the configuration enables.
    pub fn new(config: DecoratorConfig, listeners: Vec<Arc<dyn EventListener>>) -> Self {
        let mut builder = ListenerRegistry::builder();
        for listener in listeners {
            builder.register(listener);
        }

        if config.listeners.logging_enabled {
            builder.register(Arc::new(LoggingListener::new(config.listeners.logging_multiline)));
        }

        let slow_queries = config.listeners.slow_query_enabled.then(|| {
            Arc::new(SlowQueryListener::new(Duration::from_millis(
                config.listeners.slow_query_threshold_ms,
            )))
        });
        if let Some(listener) = &slow_queries {
            builder.register(listener.clone());
        }

        let query_counts = config.listeners.query_count_enabled.then(QueryCountListener::new);
        if let Some(listener) = &query_counts {
            builder.register(listener.clone());
        }

        let registry = Arc::new(builder.build());
        tracing::info!(
            "Data source decoration {} with listeners {:?}",
            if config.decoration_active() { "active" } else { "inactive" },
            registry.names()
        );

        Self {
            config,
            registry,
            query_counts,
            slow_queries,
        }
    }

    pub fn config(&self) -> &DecoratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// The built-in query counter, when enabled
    pub fn query_counts(&self) -> Option<&Arc<QueryCountListener>> {
        self.query_counts.as_ref()
    }

    /// The built-in slow query listener, when enabled
    pub fn slow_queries(&self) -> Option<&Arc<SlowQueryListener>> {
        self.slow_queries.as_ref()
    }

    pub fn should_decorate(&self, data_source: &str) -> bool {
        self.config.decoration_active() && !self.config.is_excluded(data_source)
    }

    /// Decorate `provider` according to the configuration, or return it
    /// unchanged when decoration is disabled, unsupported or excluded.
    pub fn decorate_data_source(&self, provider: Arc<dyn DataSource>) -> Arc<dyn DataSource> {
        let name = provider.metadata().name;

        if !self.should_decorate(&name) {
            tracing::debug!("Data source '{}' left undecorated", name);
            return provider;
        }

        match self.config.datasource.strategy {
            DecoratorStrategy::Listeners => decorate(provider, self.registry.clone()),
            DecoratorStrategy::None => provider,
        }
    }
}
