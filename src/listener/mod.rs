// Listener system: event vocabulary, listener SPI, registry and dispatch

pub mod dispatch;
pub mod event;
pub mod implementations;
pub mod registry;
pub mod traits;

// Re-export core types
pub use dispatch::*;
pub use event::*;
pub use implementations::*;
pub use registry::*;
pub use traits::*;
