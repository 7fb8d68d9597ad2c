//! Doctor command - run ledger health checks

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use serde_json::Value;

use super::open_context;
use crate::output;

/// Format a detail JSON value for display
fn format_detail(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let display_val = match v {
                        Value::String(s) => {
                            // Truncate long strings
                            if s.chars().count() > 60 {
                                format!("{}...", s.chars().take(57).collect::<String>())
                            } else {
                                s.clone()
                            }
                        }
                        Value::Array(arr) => {
                            if arr.len() <= 3 {
                                format!(
                                    "{:?}",
                                    arr.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>()
                                )
                            } else {
                                format!("[{} items]", arr.len())
                            }
                        }
                        _ => v.to_string(),
                    };
                    format!("{}: {}", k, display_val)
                })
                .collect();
            parts.join(", ")
        }
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

pub fn run(verbose: bool, json: bool) -> Result<()> {
    let mut ctx = open_context()?;
    let result = ctx.doctor()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.is_healthy() {
            std::process::exit(1);
        }
        return Ok(());
    }

    println!("{}", "Ledger Health Check".bold());
    println!("Accounts: {}", result.accounts);
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Check", "Status", "Message"]);

    for (check_name, check_result) in &result.checks {
        let status_cell = match check_result.status.as_str() {
            "pass" => Cell::new("PASS").fg(Color::Green),
            "warning" => Cell::new("WARN").fg(Color::Yellow),
            "error" => Cell::new("ERROR").fg(Color::Red),
            _ => Cell::new(&check_result.status),
        };

        table.add_row(vec![
            Cell::new(check_name),
            status_cell,
            Cell::new(&check_result.message),
        ]);

        if verbose {
            if let Some(details) = &check_result.details {
                for detail in details {
                    table.add_row(vec![
                        Cell::new(""),
                        Cell::new(""),
                        Cell::new(format!("  - {}", format_detail(detail))),
                    ]);
                }
            }
        }
    }

    println!("{}", table);
    println!();

    println!(
        "Summary: {} passed, {} warnings, {} errors",
        result.summary.passed.to_string().green(),
        result.summary.warnings.to_string().yellow(),
        result.summary.errors.to_string().red(),
    );

    if !result.is_healthy() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_detail_object() {
        let detail = json!({ "identity": "alice", "key": "keys/alice.json", "missing": null });
        assert_eq!(format_detail(&detail), "identity: alice, key: keys/alice.json");
    }

    #[test]
    fn test_format_detail_truncates_long_strings() {
        let detail = json!({ "error": "x".repeat(100) });
        let formatted = format_detail(&detail);
        assert!(formatted.ends_with("..."));
        assert!(formatted.len() < 80);
    }
}
