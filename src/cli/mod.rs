pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "dsspy")]
#[command(about = "dsspy - run SQL through a decorated data source and watch its lifecycle events")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        default_value = "primary",
        help = "Data source name (matched against DECORATOR_DATASOURCE_EXCLUDE)"
    )]
    pub name: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Execute a statement and report affected rows")]
    Exec {
        #[arg(help = "SQL statement")]
        sql: String,
    },

    #[command(about = "Run a query and print the returned rows")]
    Query {
        #[arg(help = "SQL query")]
        sql: String,
    },

    #[command(about = "Execute statements in one transaction, rolling back on failure")]
    Batch {
        #[arg(required = true, help = "SQL statements, executed in order")]
        statements: Vec<String>,
    },

    #[command(about = "Show the effective decorator configuration")]
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Exec { sql } => commands::sql::exec(&cli.name, &sql, output_format).await,
        Commands::Query { sql } => commands::sql::query(&cli.name, &sql, output_format).await,
        Commands::Batch { statements } => {
            commands::sql::batch(&cli.name, &statements, output_format).await
        }
        Commands::Config => commands::config::show(&cli.name, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from(["dsspy", "--json", "query", "SELECT 1"]).unwrap();

        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert_eq!(cli.name, "primary");
        assert!(matches!(cli.command, Commands::Query { ref sql } if sql == "SELECT 1"));
    }

    #[test]
    fn test_batch_requires_statements() {
        assert!(Cli::try_parse_from(["dsspy", "batch"]).is_err());

        let cli = Cli::try_parse_from(["dsspy", "--name", "audit", "batch", "DELETE FROM a", "DELETE FROM b"])
            .unwrap();
        assert_eq!(cli.name, "audit");
        assert!(matches!(cli.command, Commands::Batch { ref statements } if statements.len() == 2));
    }
}
