// Built-in listeners, attached by DecoratorContext according to configuration

pub mod logging;
pub mod query_count;
pub mod slow_query;

pub use logging::*;
pub use query_count::*;
pub use slow_query::*;
