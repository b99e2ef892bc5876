use crate::reports::UserReport;
use crate::types::{FrequencyTable, KpiRow, RangeStat, StatRow, TasteScore};
use crate::util::{format_int, format_number};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

const BAR_WIDTH: usize = 30;

pub const NO_DATA: &str = "No data for the selected user. Check the filters.";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn render_table<T>(rows: &[T]) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no data)".to_string();
    }
    Table::new(rows.to_vec()).with(Style::markdown()).to_string()
}

/// Horizontal text bars, one line per entry, scaled to the largest count.
pub fn render_bars(table: &FrequencyTable) -> String {
    if table.is_empty() {
        return "(no data)".to_string();
    }
    let max = table.iter().map(|e| e.count).max().unwrap_or(0).max(1) as f64;
    let label_width = table.iter().map(|e| e.label.chars().count()).max().unwrap_or(0);
    table
        .iter()
        .map(|e| bar_line(&e.label, label_width, e.count as f64 / max, &format_int(e.count)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Taste-score bars, marked by whether the product was actually bought.
pub fn render_taste_bars(scores: &[TasteScore]) -> String {
    if scores.is_empty() {
        return "(no data)".to_string();
    }
    let max = scores.iter().map(|t| t.score).fold(0.0_f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    let label_width = scores.iter().map(|t| t.product.chars().count()).max().unwrap_or(0);
    scores
        .iter()
        .map(|t| {
            let mark = if t.purchased { "purchased" } else { "not purchased" };
            let value = format!("{} ({})", format_number(t.score, 1), mark);
            bar_line(&t.product, label_width, t.score.max(0.0) / max, &value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bar_line(label: &str, label_width: usize, fraction: f64, value: &str) -> String {
    let len = (fraction * BAR_WIDTH as f64).round() as usize;
    let pad = label_width.saturating_sub(label.chars().count());
    format!("{}{} | {} {}", label, " ".repeat(pad), "█".repeat(len), value)
}

fn stat_row(name: &str, s: &RangeStat) -> StatRow {
    let with_unit = |v: String| if s.unit.is_empty() { v } else { format!("{} {}", v, s.unit) };
    StatRow {
        name: name.to_string(),
        average: with_unit(s.average.to_string()),
        minimum: with_unit(s.minimum.to_string()),
        maximum: with_unit(s.maximum.to_string()),
    }
}

fn kpi_rows(report: &UserReport) -> Vec<KpiRow> {
    let k = &report.kpi;
    vec![
        KpiRow {
            name: format!("Peak day ({})", k.peak_day.label),
            value: format_int(k.peak_day.count),
        },
        KpiRow {
            name: format!("Peak hour ({})", k.peak_hour.label),
            value: format_int(k.peak_hour.count),
        },
        KpiRow { name: "Produce share".to_string(), value: format!("{:.0}%", k.produce_pct) },
        KpiRow {
            name: format!("Top aisle ({})", k.top_aisle.label),
            value: format!("{}%", format_number(k.top_aisle.pct, 1)),
        },
    ]
}

/// Full terminal rendering of one user's report.
pub fn render_report(report: &UserReport) -> String {
    let mut out = String::new();
    let mut section = |title: &str, body: String| {
        out.push_str(&format!("## {}\n\n{}\n\n", title, body));
    };

    section(&format!("User #{} report", report.user_id), render_table(&[report.profile.clone()]));

    let basket_name = if report.basket_constant { "Basket size (constant)" } else { "Basket size" };
    let stats = vec![
        stat_row("Order interval", &report.order_interval),
        stat_row(basket_name, &report.basket_size),
    ];
    section("Purchase summary", render_table(&stats));
    section("Insights", report.insights.join("\n"));

    section("Purchases by day of week", render_bars(&report.dow));
    section("Purchases by hour", render_bars(&report.hour));
    section("Preferred departments", render_bars(&report.department));
    section("Preferred aisles", render_bars(&report.aisle));
    section("Key metrics", render_table(&kpi_rows(report)));

    section("Taste score by product", render_taste_bars(&report.taste_scores));
    section("Recommendations", render_table(&report.recommendations));
    let purchases = if report.actual_purchases.is_empty() {
        "(no data)".to_string()
    } else {
        report.actual_purchases.iter().map(|p| format!("- {}", p)).collect::<Vec<_>>().join("\n")
    };
    section("Actual purchases", purchases);
    out
}

pub fn print_report(report: &UserReport) {
    print!("{}", render_report(report));
}
