//! @ai:module:intent Filter, join, narrow, group, and reduce derived PRs into summaries
//! @ai:module:layer application
//! @ai:module:public_api ScopeAggregator, Engine, aggregate
//! @ai:module:depends_on derive, filters, join, scope, records
//! @ai:module:stateless true

pub mod engine;
pub mod stats;

pub use engine::Engine;

use crate::config::{DuplicatePolicy, FilterConfig};
use crate::derive::{MetricDeriver, MetricDeriverTrait};
use crate::error::Result;
use crate::filters::{ExclusionFilters, LookbackWindow};
use crate::join::TeamIndex;
use crate::records::{DerivedPr, SizeClass, SummaryRecord, SummaryTable, TeamTable};
use crate::scope::{GroupKey, Scope, ScopeSelection};
use crate::table::RawTable;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// @ai:intent A derived PR that survived filtering, with its joined team
#[derive(Debug, Clone, Copy)]
pub struct ScopedRow<'a> {
    pub pr: &'a DerivedPr,
    pub team: Option<&'a str>,
}

impl<'a> ScopedRow<'a> {
    /// @ai:intent Group value for a key, using the joined team for team grouping
    /// @ai:effects pure
    pub fn group_value(&self, key: GroupKey) -> Option<&'a str> {
        match key {
            GroupKey::Team => self.team,
            other => other.value_of(&self.pr.record),
        }
    }
}

/// @ai:intent Applies exclusion, lookback, join, narrowing, and grouping in that order
#[derive(Debug)]
pub struct ScopeAggregator {
    filters: ExclusionFilters,
    lookback_days: u32,
}

impl ScopeAggregator {
    /// @ai:intent Create an aggregator with explicit filters and lookback
    /// @ai:effects pure
    pub fn new(filters: ExclusionFilters, lookback_days: u32) -> Self {
        Self {
            filters,
            lookback_days,
        }
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// @ai:intent Rows surviving exclusion and lookback, joined with teams when requested
    /// @ai:post relative row order is preserved
    /// @ai:effects pure
    pub fn base_rows<'a>(
        &self,
        prs: &'a [DerivedPr],
        teams: Option<&'a TeamIndex>,
        now: DateTime<Utc>,
    ) -> Vec<ScopedRow<'a>> {
        let window = LookbackWindow::new(now, self.lookback_days);

        let kept: Vec<&DerivedPr> = prs
            .iter()
            .filter(|pr| self.filters.admits(&pr.record))
            .collect();
        tracing::debug!(
            "{} of {} PRs pass exclusion filters {:?}",
            kept.len(),
            prs.len(),
            self.filters
        );

        let rows: Vec<ScopedRow<'a>> = kept
            .into_iter()
            .filter(|pr| window.contains(&pr.record))
            .map(|pr| ScopedRow {
                pr,
                team: match teams {
                    Some(index) => index.team_for(&pr.record),
                    None => pr.record.team.as_deref(),
                },
            })
            .collect();
        tracing::debug!(
            "{} PRs inside the {}-day lookback window",
            rows.len(),
            self.lookback_days
        );

        rows
    }

    /// @ai:intent Produce one summary row per surviving group value
    /// @ai:pre teams is Some only when the PR table lacks its own team column
    /// @ai:post rows are sorted by group value; empty groups are absent
    /// @ai:effects pure
    pub fn summarize(
        &self,
        prs: &[DerivedPr],
        teams: Option<&TeamIndex>,
        selection: &ScopeSelection,
        group_by: GroupKey,
        now: DateTime<Utc>,
    ) -> SummaryTable {
        let teams = if needs_team_join(selection.scope(), group_by) {
            teams
        } else {
            None
        };

        let rows = self.base_rows(prs, teams, now);
        let scoped: Vec<ScopedRow<'_>> = rows
            .into_iter()
            .filter(|row| selection.admits(&row.pr.record.author, row.team))
            .collect();
        tracing::debug!(
            "{} PRs in {} scope {:?}",
            scoped.len(),
            selection.scope(),
            selection.selected()
        );

        summarize_rows(&scoped, group_by)
    }
}

impl Default for ScopeAggregator {
    fn default() -> Self {
        Self::new(
            ExclusionFilters::from_config(&FilterConfig::default()),
            crate::config::DEFAULT_LOOKBACK_DAYS,
        )
    }
}

/// @ai:intent Whether a view reads joined teams
/// @ai:effects pure
pub fn needs_team_join(scope: Scope, group_by: GroupKey) -> bool {
    scope == Scope::Team || group_by == GroupKey::Team
}

/// @ai:intent Group rows by key and reduce each group; rows without a key value are skipped
/// @ai:effects pure
pub fn summarize_rows(rows: &[ScopedRow<'_>], group_by: GroupKey) -> SummaryTable {
    let mut groups: BTreeMap<&str, Vec<&DerivedPr>> = BTreeMap::new();

    for row in rows {
        if let Some(value) = row.group_value(group_by) {
            groups.entry(value).or_default().push(row.pr);
        }
    }

    let groups: Vec<(&str, Vec<&DerivedPr>)> = groups.into_iter().collect();
    let rows = groups
        .par_iter()
        .map(|(group, prs)| reduce_group(group, prs))
        .collect();

    SummaryTable { group_by, rows }
}

/// @ai:intent Reduce one non-empty group to its summary metrics
/// @ai:effects pure
fn reduce_group(group: &str, prs: &[&DerivedPr]) -> SummaryRecord {
    let count_size = |class: SizeClass| {
        prs.iter()
            .filter(|pr| pr.size_class == Some(class))
            .count()
    };

    SummaryRecord {
        group: group.to_string(),
        prs_total: prs.len(),
        prs_merged_total: prs.iter().filter(|pr| pr.record.is_merged()).count(),
        lead_time_median_hours: stats::median(prs.iter().filter_map(|pr| pr.lead_time_hours)),
        review_latency_median_hours: stats::median(
            prs.iter().filter_map(|pr| pr.review_latency_hours),
        ),
        churn_mean: stats::mean(prs.iter().filter_map(|pr| pr.churn_ratio)),
        prs_small: count_size(SizeClass::Small),
        prs_medium: count_size(SizeClass::Medium),
        prs_large: count_size(SizeClass::Large),
    }
}

/// @ai:intent One-shot engine call: derive metrics, then aggregate a single scope
/// @ai:pre selected is required for individual and team scopes
/// @ai:effects pure
pub fn aggregate(
    pr_table: &RawTable,
    team_table: Option<&TeamTable>,
    scope: Scope,
    selected: Option<&str>,
    group_by: GroupKey,
    lookback_days: u32,
    now: DateTime<Utc>,
) -> Result<SummaryTable> {
    let selection = ScopeSelection::new(scope, selected.map(str::to_string))?;
    let prs = MetricDeriver::new().derive(pr_table)?;

    // The mapping is only consulted, and so only validated, for team views.
    let index = if needs_team_join(scope, group_by) {
        TeamIndex::for_prs(pr_table, &prs, team_table, DuplicatePolicy::Reject)?
    } else {
        None
    };

    let aggregator = ScopeAggregator::new(ExclusionFilters::default(), lookback_days);
    Ok(aggregator.summarize(&prs, index.as_ref(), &selection, group_by, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TeamMapping;
    use crate::table::Row;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 6, 0, 0, 0).unwrap()
    }

    fn base_row(overrides: Value) -> Row {
        let mut row = json!({
            "author": "alice",
            "repository": "org/repo",
            "created_at": "2026-02-01T00:00:00Z",
            "merged_at": "2026-02-02T00:00:00Z",
            "review_requested_at": "2026-02-01T12:00:00Z",
            "first_reviewed_at": "2026-02-01T14:00:00Z",
            "additions": 10,
            "deletions": 5,
            "is_fork": false,
            "is_archived": false,
            "is_bot": false
        })
        .as_object()
        .cloned()
        .unwrap();

        for (key, value) in overrides.as_object().cloned().unwrap() {
            row.insert(key, value);
        }
        row
    }

    fn table(rows: Vec<Row>) -> RawTable {
        RawTable::from_records(rows)
    }

    #[test]
    fn test_org_scope_by_repository_excludes_fork_and_bot() {
        let prs = table(vec![
            base_row(json!({"is_fork": true})),
            base_row(json!({"is_bot": true, "author": "ci[bot]"})),
            base_row(json!({"additions": 10})),
        ]);

        let summary = aggregate(
            &prs,
            None,
            Scope::Org,
            None,
            GroupKey::Repository,
            180,
            now(),
        )
        .unwrap();

        assert_eq!(summary.len(), 1);
        let row = &summary.rows[0];
        assert_eq!(row.group, "org/repo");
        assert_eq!(row.prs_total, 1);
        assert_eq!(row.prs_merged_total, 1);
        assert_eq!(row.prs_small, 1);
        assert_eq!(row.prs_medium, 0);
        assert_eq!(row.prs_large, 0);
    }

    #[test]
    fn test_bot_rows_never_counted_in_any_scope() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({"is_bot": true})),
        ]);
        let teams = TeamTable::new(vec![TeamMapping {
            author: "alice".to_string(),
            team: "core".to_string(),
            org: None,
        }]);

        let calls = [
            (Scope::Org, None, GroupKey::Author),
            (Scope::Individual, Some("alice"), GroupKey::Author),
            (Scope::Team, Some("core"), GroupKey::Team),
        ];

        for (scope, selected, group_by) in calls {
            let summary =
                aggregate(&prs, Some(&teams), scope, selected, group_by, 180, now()).unwrap();
            assert_eq!(summary.len(), 1);
            assert_eq!(summary.rows[0].prs_total, 1);
        }
    }

    #[test]
    fn test_lookback_drops_old_prs() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({
                "author": "old",
                "created_at": "2026-01-27T00:00:00Z",
                "merged_at": "2026-01-28T00:00:00Z"
            })),
        ]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Author, 5, now()).unwrap();

        let authors: Vec<_> = summary.rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(authors, vec!["alice"]);
    }

    #[test]
    fn test_medians_and_mean_per_group() {
        let prs = table(vec![
            base_row(json!({
                "created_at": "2026-02-03T00:00:00Z",
                "merged_at": "2026-02-03T10:00:00Z",
                "review_requested_at": "2026-02-03T01:00:00Z",
                "first_reviewed_at": "2026-02-03T03:00:00Z",
                "additions": 9,
                "deletions": 5
            })),
            base_row(json!({
                "created_at": "2026-02-04T00:00:00Z",
                "merged_at": "2026-02-04T20:00:00Z",
                "review_requested_at": "2026-02-04T02:00:00Z",
                "first_reviewed_at": "2026-02-04T06:00:00Z",
                "additions": 99,
                "deletions": 0
            })),
        ]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Overall, 30, now()).unwrap();
        let row = summary.get("all").unwrap();

        assert_eq!(row.lead_time_median_hours, Some(15.0));
        assert_eq!(row.review_latency_median_hours, Some(3.0));
        assert_eq!(row.churn_mean, Some(0.25));
        assert_eq!(row.prs_small, 1);
        assert_eq!(row.prs_medium, 1);
    }

    #[test]
    fn test_all_null_latencies_give_null_median() {
        let prs = table(vec![base_row(json!({
            "merged_at": null,
            "first_reviewed_at": null
        }))]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Author, 180, now()).unwrap();
        let row = &summary.rows[0];

        assert_eq!(row.prs_merged_total, 0);
        assert_eq!(row.lead_time_median_hours, None);
        assert_eq!(row.review_latency_median_hours, None);
        assert!(row.churn_mean.is_some());
    }

    #[test]
    fn test_empty_groups_are_omitted() {
        let prs = table(vec![
            base_row(json!({"repository": "org/active"})),
            base_row(json!({"repository": "org/forked", "is_fork": true})),
        ]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Repository, 180, now()).unwrap();

        assert!(summary.get("org/forked").is_none());
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn test_team_join_on_author_alone() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({"author": "bob", "merged_at": null})),
        ]);
        let teams = TeamTable::new(vec![TeamMapping {
            author: "alice".to_string(),
            team: "core".to_string(),
            org: None,
        }]);

        let summary = aggregate(
            &prs,
            Some(&teams),
            Scope::Team,
            Some("core"),
            GroupKey::Team,
            180,
            now(),
        )
        .unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(summary.rows[0].group, "core");
        assert_eq!(summary.rows[0].prs_merged_total, 1);
    }

    #[test]
    fn test_unmapped_authors_skip_team_grouping_but_not_org_views() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({"author": "bob"})),
        ]);
        let teams = TeamTable::new(vec![TeamMapping {
            author: "alice".to_string(),
            team: "core".to_string(),
            org: None,
        }]);

        let by_team =
            aggregate(&prs, Some(&teams), Scope::Org, None, GroupKey::Team, 180, now()).unwrap();
        assert_eq!(by_team.len(), 1);
        assert_eq!(by_team.rows[0].prs_total, 1);

        let by_author =
            aggregate(&prs, Some(&teams), Scope::Org, None, GroupKey::Author, 180, now())
                .unwrap();
        assert_eq!(by_author.len(), 2);
    }

    #[test]
    fn test_team_join_uses_org_when_present() {
        let prs = table(vec![
            base_row(json!({"org": "org-a", "repository": "org-a/repo"})),
            base_row(json!({"org": "org-b", "repository": "org-b/repo"})),
        ]);
        let teams = TeamTable::new(vec![
            TeamMapping {
                author: "alice".to_string(),
                team: "alpha".to_string(),
                org: Some("org-a".to_string()),
            },
            TeamMapping {
                author: "alice".to_string(),
                team: "beta".to_string(),
                org: Some("org-b".to_string()),
            },
        ]);

        let summary =
            aggregate(&prs, Some(&teams), Scope::Org, None, GroupKey::Team, 180, now()).unwrap();
        let teams: Vec<_> = summary.rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(teams, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_individual_scope_narrows_to_author() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({"author": "bob"})),
        ]);

        let summary = aggregate(
            &prs,
            None,
            Scope::Individual,
            Some("bob"),
            GroupKey::Author,
            180,
            now(),
        )
        .unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(summary.rows[0].group, "bob");
    }

    #[test]
    fn test_missing_selection_is_an_error() {
        let prs = table(vec![base_row(json!({}))]);
        let err = aggregate(&prs, None, Scope::Team, None, GroupKey::Team, 180, now())
            .unwrap_err();
        assert!(matches!(err, crate::Error::MissingSelection { .. }));
    }

    #[test]
    fn test_duplicate_team_mapping_fails_the_call() {
        let prs = table(vec![base_row(json!({}))]);
        let teams = TeamTable::new(vec![
            TeamMapping {
                author: "alice".to_string(),
                team: "core".to_string(),
                org: None,
            },
            TeamMapping {
                author: "alice".to_string(),
                team: "infra".to_string(),
                org: None,
            },
        ]);

        let err = aggregate(
            &prs,
            Some(&teams),
            Scope::Team,
            Some("core"),
            GroupKey::Team,
            180,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::JoinAmbiguity { .. }));
    }

    #[test]
    fn test_conflicting_mapping_does_not_affect_views_without_teams() {
        let prs = table(vec![base_row(json!({}))]);
        let teams = TeamTable::new(vec![
            TeamMapping {
                author: "alice".to_string(),
                team: "core".to_string(),
                org: None,
            },
            TeamMapping {
                author: "alice".to_string(),
                team: "infra".to_string(),
                org: None,
            },
        ]);

        let by_repo = aggregate(
            &prs,
            Some(&teams),
            Scope::Org,
            None,
            GroupKey::Repository,
            180,
            now(),
        )
        .unwrap();
        assert_eq!(by_repo.len(), 1);
        assert_eq!(by_repo.rows[0].prs_total, 1);

        let individual = aggregate(
            &prs,
            Some(&teams),
            Scope::Individual,
            Some("alice"),
            GroupKey::Author,
            180,
            now(),
        )
        .unwrap();
        assert_eq!(individual.len(), 1);

        let by_team = aggregate(&prs, Some(&teams), Scope::Org, None, GroupKey::Team, 180, now());
        assert!(matches!(by_team, Err(crate::Error::JoinAmbiguity { .. })));
    }

    #[test]
    fn test_null_counts_and_flags_do_not_fail_the_call() {
        let prs = table(vec![
            base_row(json!({})),
            base_row(json!({"additions": null, "author": "bob"})),
            base_row(json!({"is_bot": null, "author": "carol"})),
        ]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Author, 180, now()).unwrap();

        assert_eq!(
            summary.rows.iter().map(|r| r.group.as_str()).collect::<Vec<_>>(),
            vec!["alice", "bob"]
        );
        let bob = summary.get("bob").unwrap();
        assert_eq!(bob.prs_total, 1);
        assert_eq!(bob.prs_small + bob.prs_medium + bob.prs_large, 0);
        assert_eq!(bob.churn_mean, None);
    }

    #[test]
    fn test_identical_calls_serialize_identically() {
        let prs = table(vec![
            base_row(json!({"repository": "org/b", "additions": 400})),
            base_row(json!({"repository": "org/a", "author": "bob"})),
            base_row(json!({"repository": "org/c", "merged_at": null})),
        ]);

        let run = || {
            let summary =
                aggregate(&prs, None, Scope::Org, None, GroupKey::Repository, 180, now())
                    .unwrap();
            serde_json::to_string(&summary).unwrap()
        };

        let first = run();
        assert_eq!(first, run());
        assert!(first.find("org/a").unwrap() < first.find("org/b").unwrap());
    }

    #[test]
    fn test_org_grouping_skips_rows_without_org() {
        let prs = table(vec![
            base_row(json!({"org": "acme"})),
            base_row(json!({"org": null})),
        ]);

        let summary =
            aggregate(&prs, None, Scope::Org, None, GroupKey::Org, 180, now()).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.rows[0].group, "acme");
    }
}
