//! @ai:module:intent Author to team mapping table
//! @ai:module:layer domain
//! @ai:module:public_api TeamMapping, TeamTable
//! @ai:module:stateless true

use crate::table::{RawTable, Row};
use serde::{Deserialize, Serialize};

/// @ai:intent One author's team membership, optionally scoped to an org
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMapping {
    pub author: String,
    pub team: String,
    pub org: Option<String>,
}

/// @ai:intent Parsed team mapping with knowledge of whether it carries orgs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamTable {
    mappings: Vec<TeamMapping>,
    has_org: bool,
}

impl TeamTable {
    /// @ai:intent Build a mapping table from typed rows
    /// @ai:effects pure
    pub fn new(mappings: Vec<TeamMapping>) -> Self {
        let has_org = mappings.iter().any(|m| m.org.is_some());
        Self { mappings, has_org }
    }

    /// @ai:intent Parse an untyped mapping table, skipping rows without author or team
    /// @ai:effects pure
    pub fn from_raw(raw: &RawTable) -> Self {
        if !raw.has_column("author") || !raw.has_column("team") {
            tracing::warn!(
                "Team mapping has no author or team column; every PR will be unmapped"
            );
            return Self::default();
        }

        let mut mappings = Vec::with_capacity(raw.len());

        for (index, row) in raw.rows().iter().enumerate() {
            match (text(row, "author"), text(row, "team")) {
                (Some(author), Some(team)) => mappings.push(TeamMapping {
                    author,
                    team,
                    org: text(row, "org"),
                }),
                _ => {
                    tracing::warn!("Skipping team mapping row {} without author or team", index);
                }
            }
        }

        Self {
            has_org: raw.has_values("org"),
            mappings,
        }
    }

    pub fn mappings(&self) -> &[TeamMapping] {
        &self.mappings
    }

    /// True when at least one mapping row names an org.
    pub fn has_org(&self) -> bool {
        self.has_org
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Non-empty string value of a column; numbers are accepted as identifiers.
fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
