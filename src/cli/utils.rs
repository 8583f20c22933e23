use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::datasource::Row;
use crate::listener::QueryCount;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(fields)) = data {
                if let Some(object) = response.as_object_mut() {
                    object.extend(fields);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output query rows in the appropriate format
pub fn output_rows(output_format: &OutputFormat, rows: &[Row]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "rows": rows }))?);
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("(no rows)");
            }
            for row in rows {
                let line = row
                    .iter()
                    .map(|(column, value)| format!("{}={}", column, value))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("{}", line);
            }
            println!("({} rows)", rows.len());
        }
    }
    Ok(())
}

/// Output the query counter summary collected during the command
pub fn output_query_counts(output_format: &OutputFormat, counts: &QueryCount) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "query_counts": counts }))?);
        }
        OutputFormat::Text => {
            println!(
                "Statements: {} (select {}, insert {}, update {}, delete {}, other {}), failed {}, commits {}, rollbacks {}, {}ms",
                counts.total(),
                counts.select,
                counts.insert,
                counts.update,
                counts.delete,
                counts.other,
                counts.failure,
                counts.commits,
                counts.rollbacks,
                counts.elapsed_ms
            );
        }
    }
    Ok(())
}
