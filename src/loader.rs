//! @ai:module:intent Read PR and team tables from JSON, JSON Lines, or CSV files
//! @ai:module:layer infrastructure
//! @ai:module:public_api load_prs, load_teams, read_table
//! @ai:module:depends_on table, records

use crate::records::TeamTable;
use crate::table::{RawTable, Row};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TABLE_EXTENSIONS: [&str; 4] = ["json", "jsonl", "ndjson", "csv"];

/// @ai:intent Load the PR table from a file or a directory of table files
/// @ai:pre path exists
/// @ai:effects fs:read
pub fn load_prs(path: &Path) -> Result<RawTable> {
    if !path.exists() {
        bail!("PR dataset not found: {}", path.display());
    }

    if !path.is_dir() {
        let mut table = read_table(path)?;
        table.rename_column("repo", "repository");
        tracing::info!("Loaded {} PRs from {}", table.len(), path.display());
        return Ok(table);
    }

    let files = find_table_files(path);
    if files.is_empty() {
        bail!("No PR table files (.json, .jsonl, .csv) under {}", path.display());
    }

    let mut table = RawTable::default();
    for file in &files {
        table.extend(read_table(file)?);
    }
    table.rename_column("repo", "repository");

    tracing::info!(
        "Loaded {} PRs from {} files under {}",
        table.len(),
        files.len(),
        path.display()
    );
    Ok(table)
}

/// @ai:intent Load the optional team mapping; a missing file means no mapping
/// @ai:effects fs:read
pub fn load_teams(path: &Path) -> Result<Option<TeamTable>> {
    if !path.exists() {
        tracing::info!("No team mapping at {}; team views will be empty", path.display());
        return Ok(None);
    }

    let raw = read_table(path)?;
    let teams = TeamTable::from_raw(&raw);
    tracing::info!(
        "Loaded {} team mappings from {}",
        teams.mappings().len(),
        path.display()
    );
    Ok(Some(teams))
}

/// @ai:intent Read one table file, choosing the format by extension
/// @ai:effects fs:read
pub fn read_table(path: &Path) -> Result<RawTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table file: {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = match extension.as_str() {
        "json" => parse_json(&content),
        "jsonl" | "ndjson" => parse_json_lines(&content),
        "csv" => parse_csv(&content),
        other => bail!(
            "Unsupported table format {:?} for {}",
            other,
            path.display()
        ),
    };

    table.with_context(|| format!("Failed to parse table file: {}", path.display()))
}

/// @ai:intent Parse a JSON array of objects, or an object with a `rows` array
/// @ai:effects pure
pub fn parse_json(content: &str) -> Result<RawTable> {
    let value: Value = serde_json::from_str(content)?;

    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut object) => match object.remove("rows") {
            Some(Value::Array(records)) => records,
            _ => bail!("Expected a JSON array of records or an object with a rows array"),
        },
        _ => bail!("Expected a JSON array of records"),
    };

    let rows = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| into_row(record, index + 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(RawTable::from_records(rows))
}

/// @ai:intent Parse one JSON object per non-blank line
/// @ai:effects pure
pub fn parse_json_lines(content: &str) -> Result<RawTable> {
    let mut rows = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", index + 1))?;
        rows.push(into_row(value, index + 1)?);
    }

    Ok(RawTable::from_records(rows))
}

/// @ai:intent Parse a headed CSV file; empty cells become nulls
/// @ai:effects pure
pub fn parse_csv(content: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

fn into_row(value: Value, position: usize) -> Result<Row> {
    match value {
        Value::Object(row) => Ok(row),
        other => bail!("Record {} is not a JSON object: {}", position, other),
    }
}

/// @ai:intent Find table files in a directory, in sorted path order
/// @ai:effects fs:read
fn find_table_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| TABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}
