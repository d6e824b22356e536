//! @ai:module:intent Derive row-level PR metrics from an untyped PR table
//! @ai:module:layer application
//! @ai:module:public_api MetricDeriver, MetricDeriverTrait, REQUIRED_COLUMNS, derive_record
//! @ai:module:depends_on table, records, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::records::{DerivedPr, PrRecord, SizeClass};
use crate::table::{RawTable, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde_json::Value;

/// Columns the PR table must carry. `repository` may be supplied as `repo`.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "author",
    "repository",
    "created_at",
    "merged_at",
    "review_requested_at",
    "first_reviewed_at",
    "additions",
    "deletions",
    "is_fork",
    "is_archived",
    "is_bot",
];

const REPOSITORY_ALIAS: &str = "repo";
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// @ai:intent Trait for deriving per-PR metrics
pub trait MetricDeriverTrait: Send + Sync {
    /// @ai:intent Derive metrics for every row, preserving row count and order
    fn derive(&self, table: &RawTable) -> Result<Vec<DerivedPr>>;
}

/// @ai:intent Computes lead time, review latency, churn, and size class per PR
pub struct MetricDeriver;

impl MetricDeriver {
    /// @ai:intent Create a new metric deriver
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Check required columns and resolve the repository column name
    /// @ai:effects pure
    fn validate_schema(table: &RawTable) -> Result<&'static str> {
        let repository_column = if table.has_column("repository") {
            "repository"
        } else if table.has_column(REPOSITORY_ALIAS) {
            REPOSITORY_ALIAS
        } else {
            return Err(Error::MissingColumn {
                column: "repository".to_string(),
            });
        };

        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|c| **c != "repository")
            .find(|c| !table.has_column(c));

        match missing {
            Some(column) => Err(Error::MissingColumn {
                column: column.to_string(),
            }),
            None => Ok(repository_column),
        }
    }

    /// @ai:intent Convert one untyped row into a typed PR record
    /// @ai:effects pure
    fn parse_row(row: &Row, index: usize, repository_column: &str) -> Result<PrRecord> {
        Ok(PrRecord {
            author: identifier(row, "author", index)?,
            repository: identifier(row, repository_column, index)?,
            org: optional_identifier(row, "org"),
            team: optional_identifier(row, "team"),
            created_at: timestamp(row, "created_at"),
            merged_at: timestamp(row, "merged_at"),
            review_requested_at: timestamp(row, "review_requested_at"),
            first_reviewed_at: timestamp(row, "first_reviewed_at"),
            additions: count(row, "additions", index)?,
            deletions: count(row, "deletions", index)?,
            is_fork: flag(row, "is_fork", index)?,
            is_archived: flag(row, "is_archived", index)?,
            is_bot: flag(row, "is_bot", index)?,
        })
    }
}

impl Default for MetricDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricDeriverTrait for MetricDeriver {
    /// @ai:intent Validate schema, then type and derive every row
    /// @ai:post output length equals input length
    /// @ai:effects pure
    fn derive(&self, table: &RawTable) -> Result<Vec<DerivedPr>> {
        let repository_column = Self::validate_schema(table)?;

        let derived = table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| Self::parse_row(row, index, repository_column).map(derive_record))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Derived metrics for {} PRs", derived.len());
        Ok(derived)
    }
}

/// @ai:intent Attach derived metrics to a typed record
/// @ai:effects pure
pub fn derive_record(record: PrRecord) -> DerivedPr {
    let lead_time_hours = match (record.created_at, record.merged_at) {
        (Some(created), Some(merged)) => Some(hours(merged - created)),
        _ => None,
    };

    // Reviews recorded before the request are discarded, not clamped.
    let review_latency_hours = match (record.review_requested_at, record.first_reviewed_at) {
        (Some(requested), Some(reviewed)) if reviewed >= requested => {
            Some(hours(reviewed - requested))
        }
        _ => None,
    };

    let churn_ratio = match (record.additions, record.deletions) {
        (Some(additions), Some(deletions)) => Some(deletions as f64 / (additions as f64 + 1.0)),
        _ => None,
    };
    let size_class = record.additions.map(SizeClass::from_additions);

    DerivedPr {
        record,
        lead_time_hours,
        review_latency_hours,
        churn_ratio,
        size_class,
    }
}

fn hours(delta: TimeDelta) -> f64 {
    delta.num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Lenient timestamp cast: anything unparseable becomes null.
fn timestamp(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    match row.get(column)? {
        Value::String(s) => parse_timestamp(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// @ai:intent Parse RFC 3339, naive date-times (as UTC), or bare dates
/// @ai:effects pure
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn identifier(row: &Row, column: &str, index: usize) -> Result<String> {
    optional_identifier(row, column).ok_or_else(|| Error::ColumnType {
        column: column.to_string(),
        row: index,
        expected: "non-empty identifier",
    })
}

fn optional_identifier(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Null or blank cells are null counts; anything else must be a non-negative integer.
fn count(row: &Row, column: &str, index: usize) -> Result<Option<u64>> {
    let parsed = match row.get(column) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    parsed.map(Some).ok_or_else(|| Error::ColumnType {
        column: column.to_string(),
        row: index,
        expected: "non-negative integer",
    })
}

fn flag(row: &Row, column: &str, index: usize) -> Result<Option<bool>> {
    let parsed = match row.get(column) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Some(_) => None,
    };

    parsed.map(Some).ok_or_else(|| Error::ColumnType {
        column: column.to_string(),
        row: index,
        expected: "boolean",
    })
}
