//! @ai:module:intent Format summaries for terminals, JSON consumers, and Markdown reports
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_summary, format_options, format_derived, to_json
//! @ai:module:depends_on records
//! @ai:module:stateless true

use crate::records::{DerivedPr, SummaryTable};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as FmtWrite;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
    Markdown,
}

const METRIC_HEADERS: [&str; 8] = [
    "PRs",
    "Merged",
    "Lead time (h)",
    "Review latency (h)",
    "Churn",
    "Small",
    "Medium",
    "Large",
];

/// @ai:intent Format a summary table as a string
/// @ai:effects pure
pub fn format_summary(table: &SummaryTable, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(table, false),
        OutputFormat::JsonPretty => to_json(table, true),
        OutputFormat::Text => format_summary_text(table),
        OutputFormat::Markdown => format_summary_markdown(table),
    }
}

/// @ai:intent Render an optional metric with two decimals, `-` for null
/// @ai:effects pure
fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// @ai:intent One row of display cells, group value first
/// @ai:effects pure
fn summary_cells(table: &SummaryTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.group.clone(),
                r.prs_total.to_string(),
                r.prs_merged_total.to_string(),
                fmt_metric(r.lead_time_median_hours),
                fmt_metric(r.review_latency_median_hours),
                fmt_metric(r.churn_mean),
                r.prs_small.to_string(),
                r.prs_medium.to_string(),
                r.prs_large.to_string(),
            ]
        })
        .collect()
}

/// @ai:intent Format a summary as an aligned, colored terminal table
/// @ai:effects pure
fn format_summary_text(table: &SummaryTable) -> String {
    let mut output = String::new();

    if table.is_empty() {
        output.push_str(&format!("{}\n", "No data for the selected scope.".yellow()));
        return output;
    }

    let mut headers = vec![table.group_by.column()];
    headers.extend(METRIC_HEADERS);

    let cells = summary_cells(table);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .enumerate()
        .map(|(i, (h, w))| pad(h, *w, i == 0))
        .collect();
    output.push_str(&format!("{}\n", header_line.join("  ").bold()));

    let rule_width = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    output.push_str(&format!("{}\n", "-".repeat(rule_width).dimmed()));

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let padded = pad(cell, *w, i == 0);
                if i == 0 {
                    padded.cyan().to_string()
                } else {
                    padded
                }
            })
            .collect();
        output.push_str(&line.join("  "));
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format!(
        "{} groups by {}\n",
        table.len().to_string().bold(),
        table.group_by.column()
    ));

    output
}

fn pad(cell: &str, width: usize, left: bool) -> String {
    if left {
        format!("{:<width$}", cell, width = width)
    } else {
        format!("{:>width$}", cell, width = width)
    }
}

/// @ai:intent Format a summary as a Markdown pipe table
/// @ai:effects pure
fn format_summary_markdown(table: &SummaryTable) -> String {
    let mut output = String::new();

    writeln!(output, "## Summary by {}", table.group_by.column()).unwrap();
    writeln!(output).unwrap();

    if table.is_empty() {
        writeln!(output, "_No data for the selected scope._").unwrap();
        return output;
    }

    let mut headers = vec![table.group_by.column()];
    headers.extend(METRIC_HEADERS);

    writeln!(output, "| {} |", headers.join(" | ")).unwrap();
    writeln!(
        output,
        "|{}|",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    )
    .unwrap();

    for row in summary_cells(table) {
        writeln!(output, "| {} |", row.join(" | ")).unwrap();
    }

    output
}

/// @ai:intent Format a list of selectable values (authors, teams, ...)
/// @ai:effects pure
pub fn format_options(kind: &str, values: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&values, false),
        OutputFormat::JsonPretty => to_json(&values, true),
        OutputFormat::Markdown => {
            let mut output = format!("## Available {}\n\n", kind);
            for value in values {
                output.push_str(&format!("- {}\n", value));
            }
            output
        }
        OutputFormat::Text => {
            let mut output = format!("{} ({}):\n", kind.bold(), values.len());
            for value in values {
                output.push_str(&format!("  {}\n", value));
            }
            output
        }
    }
}

/// @ai:intent Format derived per-PR rows; text and Markdown fall back to JSON Lines
/// @ai:effects pure
pub fn format_derived(prs: &[DerivedPr], format: OutputFormat) -> String {
    match format {
        OutputFormat::JsonPretty => to_json(&prs, true),
        OutputFormat::Json => to_json(&prs, false),
        OutputFormat::Text | OutputFormat::Markdown => prs
            .iter()
            .map(|pr| to_json(pr, false))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}
