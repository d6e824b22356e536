//! @ai:module:intent Aggregation scope, selection, and grouping key types
//! @ai:module:layer domain
//! @ai:module:public_api Scope, ScopeSelection, GroupKey
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::records::PrRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Group value used by [`GroupKey::Overall`].
pub const OVERALL_GROUP: &str = "all";

/// @ai:intent Granularity at which metrics are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Individual,
    Team,
    Org,
}

impl Scope {
    /// @ai:intent Convert scope to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Individual => "individual",
            Scope::Team => "team",
            Scope::Org => "org",
        }
    }

    /// @ai:intent Whether rows must be narrowed to a selected author or team
    /// @ai:effects pure
    pub fn requires_selection(&self) -> bool {
        !matches!(self, Scope::Org)
    }

    /// @ai:intent Grouping used when the caller does not pick one
    /// @ai:effects pure
    pub fn default_group_key(&self) -> GroupKey {
        match self {
            Scope::Individual => GroupKey::Author,
            Scope::Team => GroupKey::Team,
            Scope::Org => GroupKey::Repository,
        }
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(Scope::Individual),
            "team" => Ok(Scope::Team),
            "org" => Ok(Scope::Org),
            _ => Err(Error::InvalidScope(s.to_string())),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Column a summary is grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Author,
    Team,
    Repository,
    Org,
    /// Every surviving row in a single group
    Overall,
}

impl GroupKey {
    /// @ai:intent Output column name for this key
    /// @ai:effects pure
    pub fn column(&self) -> &'static str {
        match self {
            GroupKey::Author => "author",
            GroupKey::Team => "team",
            GroupKey::Repository => "repository",
            GroupKey::Org => "org",
            GroupKey::Overall => "scope",
        }
    }

    /// @ai:intent Group value of a record, None when the record cannot join this grouping
    /// @ai:effects pure
    pub fn value_of<'a>(&self, record: &'a PrRecord) -> Option<&'a str> {
        match self {
            GroupKey::Author => Some(record.author.as_str()),
            GroupKey::Team => record.team.as_deref(),
            GroupKey::Repository => Some(record.repository.as_str()),
            GroupKey::Org => record.org.as_deref(),
            GroupKey::Overall => Some(OVERALL_GROUP),
        }
    }
}

impl FromStr for GroupKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "author" => Ok(GroupKey::Author),
            "team" => Ok(GroupKey::Team),
            "repository" | "repo" => Ok(GroupKey::Repository),
            "org" => Ok(GroupKey::Org),
            "all" | "overall" => Ok(GroupKey::Overall),
            _ => Err(Error::InvalidGroupKey(s.to_string())),
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// @ai:intent A validated scope plus the author or team it narrows to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSelection {
    scope: Scope,
    selected: Option<String>,
}

impl ScopeSelection {
    /// @ai:intent Validate that individual and team scopes carry a selection
    /// @ai:pre selected is ignored for org scope
    /// @ai:effects pure
    pub fn new(scope: Scope, selected: Option<String>) -> Result<Self> {
        let selected = selected
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if scope.requires_selection() && selected.is_none() {
            return Err(Error::MissingSelection {
                scope: scope.to_string(),
            });
        }

        let selected = if scope.requires_selection() {
            selected
        } else {
            None
        };

        Ok(Self { scope, selected })
    }

    /// @ai:intent Parse an untyped scope name and validate the selection
    /// @ai:effects pure
    pub fn parse(scope: &str, selected: Option<String>) -> Result<Self> {
        Self::new(scope.parse()?, selected)
    }

    pub fn org() -> Self {
        Self {
            scope: Scope::Org,
            selected: None,
        }
    }

    pub fn individual(author: impl Into<String>) -> Result<Self> {
        Self::new(Scope::Individual, Some(author.into()))
    }

    pub fn team(team: impl Into<String>) -> Result<Self> {
        Self::new(Scope::Team, Some(team.into()))
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// @ai:intent Whether a row with this author and joined team survives scope narrowing
    /// @ai:effects pure
    pub fn admits(&self, author: &str, team: Option<&str>) -> bool {
        match (self.scope, self.selected.as_deref()) {
            (Scope::Individual, Some(selected)) => author == selected,
            (Scope::Team, Some(selected)) => team == Some(selected),
            (Scope::Org, _) => true,
            (_, None) => false,
        }
    }
}
