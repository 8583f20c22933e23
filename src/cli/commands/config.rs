use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

pub fn show(name: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let decorated = config.decoration_active() && !config.is_excluded(name);

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Effective decorator configuration",
            Some(json!({
                "data_source": name,
                "decorated": decorated,
                "config": config,
            })),
        ),
        OutputFormat::Text => {
            println!("Environment:        {:?}", config.environment);
            println!("Data source:        {} ({})", name, if decorated { "decorated" } else { "undecorated" });
            println!("Strategy:           {:?}", config.datasource.strategy);
            println!("Support:            {:?}", config.datasource.support);
            println!("Excluded:           {}", config.datasource.exclude.join(", "));
            println!(
                "Logging listener:   {} (multiline {})",
                config.listeners.logging_enabled, config.listeners.logging_multiline
            );
            println!(
                "Slow query:         {} (threshold {}ms)",
                config.listeners.slow_query_enabled, config.listeners.slow_query_threshold_ms
            );
            println!("Query count:        {}", config.listeners.query_count_enabled);
            println!(
                "Database pool:      max {} connections, {}s acquire timeout",
                config.database.max_connections, config.database.connection_timeout
            );
            Ok(())
        }
    }
}
