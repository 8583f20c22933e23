use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoratorConfig {
    pub environment: Environment,
    pub datasource: DataSourceDecoratorConfig,
    pub listeners: ListenerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which decoration to apply to data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorStrategy {
    /// Wrap with listener notification
    Listeners,
    /// Hand out data sources untouched
    None,
}

/// Whether the decorating capability exists at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecorationSupport {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceDecoratorConfig {
    pub enabled: bool,
    pub strategy: DecoratorStrategy,
    pub support: DecorationSupport,
    /// Data source names that are never decorated
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub logging_enabled: bool,
    pub logging_multiline: bool,
    pub slow_query_enabled: bool,
    pub slow_query_threshold_ms: u64,
    pub query_count_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid configuration value: {0}")]
pub struct ParseConfigError(String);

impl FromStr for DecoratorStrategy {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listeners" | "spy" => Ok(DecoratorStrategy::Listeners),
            "none" | "off" => Ok(DecoratorStrategy::None),
            other => Err(ParseConfigError(other.to_string())),
        }
    }
}

impl FromStr for DecorationSupport {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" | "true" => Ok(DecorationSupport::Available),
            "unavailable" | "false" => Ok(DecorationSupport::Unavailable),
            other => Err(ParseConfigError(other.to_string())),
        }
    }
}

impl DecoratorConfig {
    pub fn from_env() -> Self {
        Self::for_environment(env::var("APP_ENV").ok().as_deref()).with_env_overrides()
    }

    /// Defaults for an `APP_ENV` value
    pub fn for_environment(app_env: Option<&str>) -> Self {
        match app_env {
            Some("production") | Some("prod") => Self::production(),
            Some("staging") | Some("stage") => Self::staging(),
            _ => Self::development(),
        }
    }

    /// True when data sources should be decorated at all
    pub fn decoration_active(&self) -> bool {
        self.datasource.enabled
            && self.datasource.support == DecorationSupport::Available
            && self.datasource.strategy != DecoratorStrategy::None
    }

    pub fn is_excluded(&self, data_source: &str) -> bool {
        self.datasource.exclude.iter().any(|name| name == data_source)
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; unparsable values keep the default
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Data source decoration
        if let Some(v) = lookup("DECORATOR_DATASOURCE_ENABLED") {
            self.datasource.enabled = v.parse().unwrap_or(self.datasource.enabled);
        }
        if let Some(v) = lookup("DECORATOR_DATASOURCE_STRATEGY") {
            self.datasource.strategy = v.parse().unwrap_or(self.datasource.strategy);
        }
        if let Some(v) = lookup("DECORATOR_DATASOURCE_SUPPORT") {
            self.datasource.support = v.parse().unwrap_or(self.datasource.support);
        }
        if let Some(v) = lookup("DECORATOR_DATASOURCE_EXCLUDE") {
            self.datasource.exclude = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Built-in listeners
        if let Some(v) = lookup("DECORATOR_LOGGING_ENABLED") {
            self.listeners.logging_enabled = v.parse().unwrap_or(self.listeners.logging_enabled);
        }
        if let Some(v) = lookup("DECORATOR_LOGGING_MULTILINE") {
            self.listeners.logging_multiline = v.parse().unwrap_or(self.listeners.logging_multiline);
        }
        if let Some(v) = lookup("DECORATOR_SLOW_QUERY_ENABLED") {
            self.listeners.slow_query_enabled = v.parse().unwrap_or(self.listeners.slow_query_enabled);
        }
        if let Some(v) = lookup("DECORATOR_SLOW_QUERY_THRESHOLD_MS") {
            self.listeners.slow_query_threshold_ms =
                v.parse().unwrap_or(self.listeners.slow_query_threshold_ms);
        }
        if let Some(v) = lookup("DECORATOR_QUERY_COUNT_ENABLED") {
            self.listeners.query_count_enabled = v.parse().unwrap_or(self.listeners.query_count_enabled);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            datasource: DataSourceDecoratorConfig::default(),
            listeners: ListenerConfig {
                logging_enabled: true,
                logging_multiline: false,
                slow_query_enabled: true,
                slow_query_threshold_ms: 100,
                query_count_enabled: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            datasource: DataSourceDecoratorConfig::default(),
            listeners: ListenerConfig {
                logging_enabled: true,
                logging_multiline: false,
                slow_query_enabled: true,
                slow_query_threshold_ms: 500,
                query_count_enabled: true,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            datasource: DataSourceDecoratorConfig::default(),
            listeners: ListenerConfig {
                logging_enabled: false,
                logging_multiline: false,
                slow_query_enabled: true,
                slow_query_threshold_ms: 1000,
                query_count_enabled: true,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
        }
    }
}

impl Default for DataSourceDecoratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: DecoratorStrategy::Listeners,
            support: DecorationSupport::Available,
            exclude: Vec::new(),
        }
    }
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<DecoratorConfig> = Lazy::new(DecoratorConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static DecoratorConfig {
    &CONFIG
}
