//! @ai:module:intent Column-aware row container for untyped input tables
//! @ai:module:layer domain
//! @ai:module:public_api RawTable, Row
//! @ai:module:stateless true

use serde_json::{Map, Value};

/// A single untyped input row, keyed by column name.
pub type Row = Map<String, Value>;

/// @ai:intent Untyped table as delivered by the ingestion or persistence collaborators
///
/// Column presence is tracked separately from row contents so a column that is
/// declared but entirely null still counts as present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RawTable {
    /// @ai:intent Build a table with an explicit header
    /// @ai:effects pure
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self {
            columns: Vec::with_capacity(columns.len()),
            rows,
        };
        for column in columns {
            table.add_column(column);
        }
        table
    }

    /// @ai:intent Build a table from JSON objects, taking the union of their keys as columns
    /// @ai:pre every element is a JSON object
    /// @ai:effects pure
    pub fn from_records(records: Vec<Row>) -> Self {
        let mut table = Self::default();
        for record in &records {
            for key in record.keys() {
                table.add_column(key.clone());
            }
        }
        table.rows = records;
        table
    }

    /// @ai:intent Append rows from another table, merging headers
    /// @ai:effects pure
    pub fn extend(&mut self, other: RawTable) {
        for column in other.columns {
            self.add_column(column);
        }
        self.rows.extend(other.rows);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// @ai:intent True when the column exists and at least one row holds a non-null value in it
    /// @ai:effects pure
    pub fn has_values(&self, name: &str) -> bool {
        self.has_column(name)
            && self
                .rows
                .iter()
                .any(|row| row.get(name).is_some_and(|v| !v.is_null()))
    }

    /// @ai:intent Rename a column in the header and in every row
    /// @ai:post a pre-existing column named `to` is left untouched
    /// @ai:effects pure
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if self.has_column(to) || !self.has_column(from) {
            return;
        }

        for column in &mut self.columns {
            if column == from {
                *column = to.to_string();
            }
        }

        for row in &mut self.rows {
            if let Some(value) = row.remove(from) {
                row.insert(to.to_string(), value);
            }
        }
    }

    fn add_column(&mut self, column: String) {
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }
}
