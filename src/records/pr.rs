//! @ai:module:intent Pull-request records before and after metric derivation
//! @ai:module:layer domain
//! @ai:module:public_api PrRecord, DerivedPr, SizeClass
//! @ai:module:stateless true

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Additions below this are Small.
pub const MEDIUM_MIN_ADDITIONS: u64 = 50;
/// Additions at or above this are Large.
pub const LARGE_MIN_ADDITIONS: u64 = 300;

/// @ai:intent Magnitude bucket of a PR based on added lines
/// @ai:effects pure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    /// @ai:intent Classify by added lines using half-open intervals [0,50), [50,300), [300,inf)
    /// @ai:effects pure
    pub fn from_additions(additions: u64) -> Self {
        if additions < MEDIUM_MIN_ADDITIONS {
            SizeClass::Small
        } else if additions < LARGE_MIN_ADDITIONS {
            SizeClass::Medium
        } else {
            SizeClass::Large
        }
    }

    /// @ai:intent Convert size class to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Small => "Small",
            SizeClass::Medium => "Medium",
            SizeClass::Large => "Large",
        }
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent One pull request as read from the input table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrRecord {
    pub author: String,
    pub repository: String,
    pub org: Option<String>,
    /// Present only when the PR table already carries a team column
    /// or after the team join
    pub team: Option<String>,
    /// Null only when the source value was missing or unparseable
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub review_requested_at: Option<DateTime<Utc>>,
    pub first_reviewed_at: Option<DateTime<Utc>>,
    /// Null counts and flags stay null; they are never defaulted
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
    pub is_fork: Option<bool>,
    pub is_archived: Option<bool>,
    pub is_bot: Option<bool>,
}

impl PrRecord {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// @ai:intent A PR record plus its row-level derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedPr {
    #[serde(flatten)]
    pub record: PrRecord,
    pub lead_time_hours: Option<f64>,
    pub review_latency_hours: Option<f64>,
    /// Null when either line count is null
    pub churn_ratio: Option<f64>,
    /// Null only when additions is null
    pub size_class: Option<SizeClass>,
}
