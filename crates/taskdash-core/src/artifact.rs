//! Turns the current task set into the three export artifacts: a tabular
//! CSV snapshot, a structured JSON snapshot with a metadata envelope, and a
//! plain-text summary report. All three are deterministic for a given task
//! set, timestamp and destination, so the outputs double as stable contracts
//! for downstream backup and audit tooling.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{BusinessArea, Phase, PriceTotals, Task};

pub const DASHBOARD_VERSION: &str = "1.0.0";

/// Fixed column set of the tabular snapshot. Order matters: consumers index
/// by position.
const CSV_HEADERS: [&str; 13] = [
    "ID",
    "Title",
    "Client",
    "Description",
    "Business Area",
    "Phase",
    "Responsible",
    "Deadline",
    "Purchase Price",
    "Sale Price",
    "Markup Margin",
    "Created At",
    "Updated At",
];

/// Render the task set as CSV, one row per task plus the header row.
pub fn tabular(tasks: &[Task]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADERS.iter().map(|h| h.to_string()));

    for task in tasks {
        push_row(
            &mut out,
            [
                task.id.to_string(),
                task.title.clone(),
                task.client.clone().unwrap_or_default(),
                task.description.clone().unwrap_or_default(),
                task.business_area.slug().to_string(),
                task.phase.slug().to_string(),
                task.responsible.clone().unwrap_or_default(),
                task.deadline.clone().unwrap_or_default(),
                format!("{:.2}", task.purchase_price),
                format!("{:.2}", task.sale_price),
                format!("{:.2}", task.markup_margin),
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
            ]
            .into_iter(),
        );
    }

    out
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_csv(&field));
    }
    out.push_str("\r\n");
}

/// RFC 4180 quoting: fields containing separators, quotes or line breaks
/// are wrapped in double quotes with embedded quotes doubled.
fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Metadata envelope wrapped around the structured snapshot.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    export_timestamp: String,
    total_tasks: usize,
    dashboard_version: &'static str,
    destination: &'a str,
    tasks: &'a [Task],
}

/// Render the task set as a pretty-printed JSON snapshot. An empty string
/// means generation failed and the artifact must not be uploaded.
pub fn structured(tasks: &[Task], now: DateTime<Utc>, destination: &str) -> String {
    let envelope = Envelope {
        export_timestamp: now.to_rfc3339(),
        total_tasks: tasks.len(),
        dashboard_version: DASHBOARD_VERSION,
        destination,
        tasks,
    };

    serde_json::to_string_pretty(&envelope).unwrap_or_default()
}

/// Pointer artifact recording the keys written by the most recent cycle.
/// Uploaded last, under a fixed key, so "find the latest export" is a
/// single read.
#[derive(Debug, Clone, Serialize)]
pub struct Pointer {
    pub last_export: String,
    pub files: PointerFiles,
    pub destination: String,
    pub total_tasks: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PointerFiles {
    pub csv: Option<String>,
    pub json: Option<String>,
    pub report: Option<String>,
}

impl Pointer {
    pub fn render(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Render the narrative summary report.
pub fn report(
    tasks: &[Task],
    totals: &PriceTotals,
    now: DateTime<Utc>,
    destination: &str,
    retention_days: u32,
) -> String {
    let total = tasks.len();
    let mut out = String::new();

    out.push_str("TASK DASHBOARD BACKUP REPORT\n");
    out.push_str("============================\n");
    out.push_str(&format!(
        "Generated: {} UTC\n",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Destination: {}\n\n", destination));

    out.push_str("OVERVIEW\n");
    out.push_str("--------\n");
    out.push_str(&format!("Total tasks: {}\n\n", total));

    out.push_str("BREAKDOWN BY PHASE\n");
    out.push_str("------------------\n");
    for phase in Phase::ALL {
        let count = tasks.iter().filter(|t| t.phase == phase).count();
        out.push_str(&format!(
            "{}: {} ({:.1}%)\n",
            phase.label(),
            count,
            percentage(count, total)
        ));
    }
    out.push('\n');

    out.push_str("BREAKDOWN BY BUSINESS AREA\n");
    out.push_str("--------------------------\n");
    for area in BusinessArea::ALL {
        let count = tasks.iter().filter(|t| t.business_area == area).count();
        out.push_str(&format!(
            "{}: {} ({:.1}%)\n",
            area.label(),
            count,
            percentage(count, total)
        ));
    }
    out.push('\n');

    out.push_str("FINANCIAL SUMMARY\n");
    out.push_str("-----------------\n");
    out.push_str(&format!(
        "Total purchase value: $ {}\n",
        format_money(totals.purchase)
    ));
    out.push_str(&format!(
        "Total sale value: $ {}\n",
        format_money(totals.sale)
    ));
    out.push_str(&format!(
        "Gross profit: $ {}\n",
        format_money(totals.gross_profit())
    ));
    out.push_str(&format!("Average margin: {:.1}%\n\n", totals.average_margin()));

    out.push_str("BACKUP DETAILS\n");
    out.push_str("--------------\n");
    out.push_str(&format!("Destination: {}\n", destination));
    out.push_str(&format!(
        "Retention: {} days for superseded versions\n\n",
        retention_days
    ));

    out.push_str("============================\n");
    out.push_str("Automated export - Task Dashboard\n");

    out
}

fn percentage(count: usize, total: usize) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Two-decimal money rendering with thousands separators.
fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}
