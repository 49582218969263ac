use chrono::{Local, TimeZone};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::snapshot::RateSnapshot;

/// Creates a new `comfy_table::Table` with standard styling.
fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an optional rate into a cell. Absent rates render as a dimmed
/// "N/A" placeholder, never as an error.
fn rate_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value).set_alignment(CellAlignment::Right),
        None => Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
    }
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn render_snapshot(snapshot: &RateSnapshot) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("Source"), header_cell("Rate")]);
    table.add_row(vec![
        Cell::new("BCV USD (VES)"),
        rate_cell(snapshot.bcv_rate.as_deref()),
    ]);
    table.add_row(vec![
        Cell::new("BCV EUR (VES)"),
        rate_cell(snapshot.euro_rate.as_deref()),
    ]);
    table.add_row(vec![
        Cell::new("Binance P2P USDT (VES)"),
        rate_cell(snapshot.binance_rate.as_deref()),
    ]);
    table.add_row(vec![
        Cell::new("Satoshis per USD"),
        rate_cell(snapshot.satoshi_rate.as_deref()),
    ]);

    format!(
        "{}\n{}",
        table,
        style(&format!("Updated: {}", format_timestamp(snapshot.timestamp))).dim()
    )
}

pub fn render_no_data() -> String {
    style("No rates fetched yet. Run `vesrates fetch` first.")
        .dim()
        .to_string()
}

pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_rates_render_as_placeholder() {
        let snapshot = RateSnapshot {
            bcv_rate: Some("36.50".to_string()),
            euro_rate: None,
            binance_rate: None,
            satoshi_rate: None,
            timestamp: 1700000000000,
        };
        let rendered = render_snapshot(&snapshot);
        assert!(rendered.contains("36.50"));
        assert!(rendered.contains("N/A"));
        assert!(rendered.contains("Updated:"));
    }

    #[test]
    fn test_no_data_message_is_distinct_from_empty_snapshot() {
        let empty = RateSnapshot::new(None, None, None, None);
        assert_ne!(render_no_data(), render_snapshot(&empty));
    }
}
