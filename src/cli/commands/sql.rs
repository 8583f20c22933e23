use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::{output_query_counts, output_rows, output_success};
use crate::cli::OutputFormat;
use crate::config;
use crate::datasource::{Connection, DataSource, PgDataSource};
use crate::decorator::DecoratorContext;

/// Open the PostgreSQL data source from DATABASE_URL and decorate it per
/// the environment configuration
async fn open(name: &str) -> anyhow::Result<(DecoratorContext, Arc<dyn DataSource>)> {
    let context = DecoratorContext::new(config::config().clone(), Vec::new());

    let source = PgDataSource::from_env(name, &context.config().database)
        .await
        .with_context(|| format!("failed to open data source '{}'", name))?;
    let source = context.decorate_data_source(Arc::new(source));

    Ok((context, source))
}

fn report(context: &DecoratorContext, output_format: &OutputFormat) -> anyhow::Result<()> {
    if let Some(counts) = context.query_counts() {
        output_query_counts(output_format, &counts.snapshot())?;
    }
    Ok(())
}

pub async fn exec(name: &str, sql: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let (context, source) = open(name).await?;
    let mut conn = source.get_connection().await?;

    let result = conn.execute(sql).await;
    let closed = conn.close().await;
    let affected = result?;
    closed?;

    output_success(
        &output_format,
        &format!("{} rows affected", affected),
        Some(json!({ "rows_affected": affected })),
    )?;
    report(&context, &output_format)
}

pub async fn query(name: &str, sql: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let (context, source) = open(name).await?;
    let mut conn = source.get_connection().await?;

    let result = conn.query(sql).await;
    let closed = conn.close().await;
    let rows = result?;
    closed?;

    output_rows(&output_format, &rows)?;
    report(&context, &output_format)
}

pub async fn batch(name: &str, statements: &[String], output_format: OutputFormat) -> anyhow::Result<()> {
    let (context, source) = open(name).await?;
    let mut conn = source.get_connection().await?;

    let result = run_in_transaction(conn.as_mut(), statements).await;
    let closed = conn.close().await;
    let counts = result?;
    closed?;

    output_success(
        &output_format,
        &format!(
            "{} statements committed, {} rows affected",
            counts.len(),
            counts.iter().sum::<u64>()
        ),
        Some(json!({ "rows_affected": counts })),
    )?;
    report(&context, &output_format)
}

async fn run_in_transaction(
    conn: &mut dyn Connection,
    statements: &[String],
) -> anyhow::Result<Vec<u64>> {
    let statements: Vec<&str> = statements.iter().map(String::as_str).collect();

    conn.begin().await.context("failed to begin transaction")?;
    match conn.execute_batch(&statements).await {
        Ok(counts) => {
            conn.commit().await.context("failed to commit transaction")?;
            Ok(counts)
        }
        Err(error) => {
            if let Err(rollback_error) = conn.rollback().await {
                tracing::error!("Rollback failed: {}", rollback_error);
            }
            Err(error).context("batch failed, transaction rolled back")
        }
    }
}
