//! @ai:module:intent Per-group summary rows produced by the scope aggregator
//! @ai:module:layer domain
//! @ai:module:public_api SummaryRecord, SummaryTable
//! @ai:module:stateless true

use crate::scope::GroupKey;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// @ai:intent Metrics for one distinct group value
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub group: String,
    pub prs_total: usize,
    pub prs_merged_total: usize,
    pub lead_time_median_hours: Option<f64>,
    pub review_latency_median_hours: Option<f64>,
    pub churn_mean: Option<f64>,
    pub prs_small: usize,
    pub prs_medium: usize,
    pub prs_large: usize,
}

/// @ai:intent Summary rows sorted by group value, tagged with the grouping key
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub group_by: GroupKey,
    pub rows: Vec<SummaryRecord>,
}

impl SummaryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// @ai:intent Look up the row for a group value
    /// @ai:effects pure
    pub fn get(&self, group: &str) -> Option<&SummaryRecord> {
        self.rows.iter().find(|r| r.group == group)
    }
}

/// Serializes one row with the group column named after the grouping key.
struct KeyedRow<'a> {
    column: &'static str,
    record: &'a SummaryRecord,
}

impl Serialize for KeyedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let r = self.record;
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry(self.column, &r.group)?;
        map.serialize_entry("prs_total", &r.prs_total)?;
        map.serialize_entry("prs_merged_total", &r.prs_merged_total)?;
        map.serialize_entry("lead_time_median_hours", &r.lead_time_median_hours)?;
        map.serialize_entry("review_latency_median_hours", &r.review_latency_median_hours)?;
        map.serialize_entry("churn_mean", &r.churn_mean)?;
        map.serialize_entry("prs_small", &r.prs_small)?;
        map.serialize_entry("prs_medium", &r.prs_medium)?;
        map.serialize_entry("prs_large", &r.prs_large)?;
        map.end()
    }
}

impl Serialize for SummaryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let column = self.group_by.column();
        let rows: Vec<_> = self
            .rows
            .iter()
            .map(|record| KeyedRow { column, record })
            .collect();

        let mut table = serializer.serialize_struct("SummaryTable", 2)?;
        table.serialize_field("group_by", column)?;
        table.serialize_field("rows", &rows)?;
        table.end()
    }
}
