//! One-shot read commands.
//!
//! These talk to the engine directly and print to stdout; nothing is cached.

use anyhow::{Context, Result};
use quantbot_core::{EngineStatus, ParamGroup, TradingConfig};
use quantbot_engine_client::EngineApi;
use serde_json::Value;
use std::fmt::Write as _;

/// Prints the engine status.
///
/// # Errors
/// Returns an error if the engine cannot be reached or answers with an error.
pub async fn run_status(api: &dyn EngineApi) -> Result<()> {
    let status = api.get_status().await.context("Failed to fetch status")?;
    println!("{}", format_status(&status));
    Ok(())
}

/// Prints the trading configuration grouped like the dashboard.
///
/// # Errors
/// Returns an error if the engine cannot be reached or answers with an error.
pub async fn run_config(api: &dyn EngineApi) -> Result<()> {
    let config = api.get_config().await.context("Failed to fetch config")?;
    print!("{}", format_config(&config));
    Ok(())
}

/// # Errors
/// Returns an error if the engine cannot be reached or answers with an error.
pub async fn run_positions(api: &dyn EngineApi) -> Result<()> {
    let positions = api
        .get_positions()
        .await
        .context("Failed to fetch positions")?;
    print!("{}", format_records(&positions, "No active positions"));
    Ok(())
}

/// # Errors
/// Returns an error if the engine cannot be reached or answers with an error.
pub async fn run_orders(api: &dyn EngineApi) -> Result<()> {
    let orders = api.get_orders().await.context("Failed to fetch orders")?;
    print!("{}", format_records(&orders, "No recent orders"));
    Ok(())
}

pub fn format_status(status: &EngineStatus) -> String {
    format!(
        "Status:      {}\nRun count:   {}\nOpen trades: {}",
        if status.running { "RUNNING" } else { "STOPPED" },
        status.run_count,
        status.total_trades_open
    )
}

pub fn format_config(config: &TradingConfig) -> String {
    let mut out = String::new();
    for group in ParamGroup::ALL {
        let _ = writeln!(out, "{}", group.title());
        let _ = writeln!(out, "{}", "─".repeat(48));
        for key in group.keys() {
            let _ = writeln!(
                out,
                "  {:<28} {:>10}   {}",
                key.label(),
                key.format_display(config),
                key.as_str()
            );
        }
        out.push('\n');
    }

    if !config.extra.is_empty() {
        let _ = writeln!(out, "Other");
        let _ = writeln!(out, "{}", "─".repeat(48));
        for (key, value) in &config.extra {
            let _ = writeln!(out, "  {key:<28} {value}");
        }
    }
    out
}

/// Pretty JSON per record, separated by blank lines.
pub fn format_records(records: &[Value], empty: &str) -> String {
    if records.is_empty() {
        return format!("{empty}\n");
    }
    records
        .iter()
        .map(|r| serde_json::to_string_pretty(r).unwrap_or_else(|_| r.to_string()) + "\n")
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_status() {
        let text = format_status(&EngineStatus {
            running: true,
            run_count: 42,
            total_trades_open: 3,
        });
        assert!(text.contains("RUNNING"));
        assert!(text.contains("42"));
    }

    #[test]
    fn test_format_config_groups_and_units() {
        let config = TradingConfig {
            leverage: 25,
            sl: 0.02,
            ..Default::default()
        };
        let text = format_config(&config);
        assert!(text.contains("Trading Mode"));
        assert!(text.contains("Advanced Settings"));
        assert!(text.contains("25x"));
        assert!(text.contains("2.0%"));
        assert!(!text.contains("Other"));
    }

    #[test]
    fn test_format_config_lists_unknown_keys() {
        let mut config = TradingConfig::default();
        config.extra.insert("MIN_VOLUME".to_string(), json!(1000));
        let text = format_config(&config);
        assert!(text.contains("Other"));
        assert!(text.contains("MIN_VOLUME"));
    }

    #[test]
    fn test_format_records() {
        assert_eq!(format_records(&[], "No recent orders"), "No recent orders\n");

        let text = format_records(&[json!({"id": 1}), json!({"id": 2})], "none");
        assert!(text.contains("\"id\": 1"));
        assert!(text.contains("\"id\": 2"));
    }
}
