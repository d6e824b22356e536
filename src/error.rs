//! @ai:module:intent Define error types for the metrics engine
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use thiserror::Error;

/// @ai:intent Unified error type for all engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("PR table is missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Column {column} has a value of the wrong type at row {row}: expected {expected}")]
    ColumnType {
        column: String,
        row: usize,
        expected: &'static str,
    },

    #[error("Invalid scope: {0} (expected individual, team, or org)")]
    InvalidScope(String),

    #[error("Scope {scope} requires a selected value")]
    MissingSelection { scope: String },

    #[error("Team mapping has more than one team for author {author}{}", org_suffix(.org))]
    JoinAmbiguity { author: String, org: Option<String> },

    #[error("Invalid group key: {0} (expected author, team, repository, org, or all)")]
    InvalidGroupKey(String),
}

impl Error {
    /// @ai:intent True for errors describing a malformed input table
    /// @ai:effects pure
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Error::MissingColumn { .. } | Error::ColumnType { .. })
    }
}

fn org_suffix(org: &Option<String>) -> String {
    match org {
        Some(org) => format!(" in org {}", org),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
