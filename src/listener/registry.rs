use std::fmt;
use std::sync::Arc;

use crate::listener::traits::EventListener;

/// Ordered, read-only collection of listeners.
///
/// Registration order is dispatch order. The same listener may appear more
/// than once and is then notified once per entry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl ListenerRegistry {
    pub fn new(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self { listeners }
    }

    pub fn builder() -> ListenerRegistryBuilder {
        ListenerRegistryBuilder::default()
    }

    /// All listeners, in dispatch order
    pub fn all(&self) -> &[Arc<dyn EventListener>] {
        &self.listeners
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.names())
            .finish()
    }
}

impl From<Vec<Arc<dyn EventListener>>> for ListenerRegistry {
    fn from(listeners: Vec<Arc<dyn EventListener>>) -> Self {
        Self::new(listeners)
    }
}

/// Startup-time builder; the registry it produces cannot be modified.
#[derive(Default)]
pub struct ListenerRegistryBuilder {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl ListenerRegistryBuilder {
    /// Append a listener
    pub fn register(&mut self, listener: Arc<dyn EventListener>) -> &mut Self {
        tracing::debug!(
            "Registered listener '{}' at position {}",
            listener.name(),
            self.listeners.len()
        );
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> ListenerRegistry {
        ListenerRegistry::new(self.listeners)
    }
}
