//! @ai:module:intent Long-lived engine session over one derived PR snapshot
//! @ai:module:layer application
//! @ai:module:public_api Engine
//! @ai:module:depends_on aggregate, derive, join, config

use super::{needs_team_join, ScopeAggregator, ScopedRow};
use crate::config::EngineConfig;
use crate::derive::{MetricDeriver, MetricDeriverTrait};
use crate::error::{Error, Result};
use crate::filters::ExclusionFilters;
use crate::join::TeamIndex;
use crate::records::{DerivedPr, SummaryTable, TeamTable};
use crate::scope::{GroupKey, ScopeSelection};
use crate::table::RawTable;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// @ai:intent Derives a PR table once, then answers any number of scope queries
///
/// The derived rows and team index are shared immutable snapshots, so clones
/// are cheap and concurrent callers always see one consistent table.
///
/// An ambiguous team mapping is kept as its error and only surfaces from views
/// that read teams.
#[derive(Debug, Clone)]
pub struct Engine {
    prs: Arc<[DerivedPr]>,
    teams: Option<std::result::Result<Arc<TeamIndex>, Error>>,
    aggregator: Arc<ScopeAggregator>,
    now: Option<DateTime<Utc>>,
}

impl Engine {
    /// @ai:intent Validate and derive the PR table and index the optional team mapping
    /// @ai:pre a `team` column in the PR table takes precedence over the mapping
    /// @ai:effects pure
    pub fn new(prs: &RawTable, teams: Option<&TeamTable>, config: &EngineConfig) -> Result<Self> {
        let derived = MetricDeriver::new().derive(prs)?;

        let index = TeamIndex::for_prs(prs, &derived, teams, config.join.duplicates).transpose();
        if let Some(Err(e)) = &index {
            tracing::warn!("{}; team views will fail until the mapping is fixed", e);
        }

        let mut engine = Self::from_parts(derived, None, config);
        engine.teams = index.map(|r| r.map(Arc::new));
        Ok(engine)
    }

    /// @ai:intent Build an engine from already-derived rows
    /// @ai:effects pure
    pub fn from_parts(prs: Vec<DerivedPr>, teams: Option<TeamIndex>, config: &EngineConfig) -> Self {
        Self {
            prs: prs.into(),
            teams: teams.map(|index| Ok(Arc::new(index))),
            aggregator: Arc::new(ScopeAggregator::new(
                ExclusionFilters::from_config(&config.filters),
                config.lookback_days,
            )),
            now: None,
        }
    }

    /// @ai:intent Pin the clock used by the lookback filter
    /// @ai:effects pure
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// @ai:intent Current reference time, wall clock unless pinned
    /// @ai:effects time
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn derived(&self) -> &[DerivedPr] {
        &self.prs
    }

    pub fn lookback_days(&self) -> u32 {
        self.aggregator.lookback_days()
    }

    /// @ai:intent Whether any team information is available for team views
    /// @ai:effects pure
    pub fn has_team_data(&self) -> bool {
        self.teams.is_some() || self.prs.iter().any(|pr| pr.record.team.is_some())
    }

    /// @ai:intent Team index for a view, failing only when the view reads teams
    /// @ai:effects pure
    fn team_index(&self, needed: bool) -> Result<Option<&TeamIndex>> {
        match &self.teams {
            Some(index) if needed => index.as_deref().map(Some).map_err(Clone::clone),
            _ => Ok(None),
        }
    }

    /// @ai:intent Summarize one scope selection grouped by the given key
    /// @ai:post fails with JoinAmbiguity only for team views over an ambiguous mapping
    /// @ai:effects time
    pub fn summarize(&self, selection: &ScopeSelection, group_by: GroupKey) -> Result<SummaryTable> {
        let needs_team = needs_team_join(selection.scope(), group_by);
        if needs_team && !self.has_team_data() {
            tracing::warn!("Team view requested but no team mapping or team column is available");
        }

        let teams = self.team_index(needs_team)?;
        Ok(self
            .aggregator
            .summarize(&self.prs, teams, selection, group_by, self.now()))
    }

    /// @ai:intent Summarize from untyped scope, selection, and group key values
    /// @ai:post an absent group key falls back to the scope's default grouping
    /// @ai:effects time
    pub fn summarize_str(
        &self,
        scope: &str,
        selected: Option<&str>,
        group_by: Option<&str>,
    ) -> Result<SummaryTable> {
        let selection = ScopeSelection::parse(scope, selected.map(str::to_string))?;
        let group_by = match group_by {
            Some(key) => key.parse()?,
            None => selection.scope().default_group_key(),
        };
        self.summarize(&selection, group_by)
    }

    /// @ai:intent Sorted distinct authors among filtered PRs
    /// @ai:effects time
    pub fn available_authors(&self) -> Vec<String> {
        self.distinct(GroupKey::Author, None)
    }

    /// @ai:intent Sorted distinct teams among filtered PRs after the team join
    /// @ai:effects time
    pub fn available_teams(&self) -> Result<Vec<String>> {
        let teams = self.team_index(true)?;
        Ok(self.distinct(GroupKey::Team, teams))
    }

    /// @ai:intent Sorted distinct repositories among filtered PRs
    /// @ai:effects time
    pub fn available_repositories(&self) -> Vec<String> {
        self.distinct(GroupKey::Repository, None)
    }

    /// @ai:intent Sorted distinct orgs among filtered PRs
    /// @ai:effects time
    pub fn available_orgs(&self) -> Vec<String> {
        self.distinct(GroupKey::Org, None)
    }

    fn distinct(&self, key: GroupKey, teams: Option<&TeamIndex>) -> Vec<String> {
        let rows: Vec<ScopedRow<'_>> = self.aggregator.base_rows(&self.prs, teams, self.now());

        rows.iter()
            .filter_map(|row| row.group_value(key))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DuplicatePolicy, FilterConfig};
    use crate::table::Row;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 6, 0, 0, 0).unwrap()
    }

    fn rows(records: Value) -> Vec<Row> {
        records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                let mut row = json!({
                    "author": "alice",
                    "repository": "org/repo",
                    "created_at": "2026-02-01T00:00:00Z",
                    "merged_at": "2026-02-02T00:00:00Z",
                    "review_requested_at": null,
                    "first_reviewed_at": null,
                    "additions": 10,
                    "deletions": 5,
                    "is_fork": false,
                    "is_archived": false,
                    "is_bot": false
                })
                .as_object()
                .cloned()
                .unwrap();
                for (k, v) in r.as_object().unwrap() {
                    row.insert(k.clone(), v.clone());
                }
                row
            })
            .collect()
    }

    fn teams() -> TeamTable {
        TeamTable::from_raw(&RawTable::from_records(
            json!([
                {"author": "alice", "team": "core"},
                {"author": "bob", "team": "infra"}
            ])
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect(),
        ))
    }

    #[test]
    fn test_available_options_are_sorted_and_filtered() {
        let prs = RawTable::from_records(rows(json!([
            {"author": "carol", "repository": "org/z"},
            {"author": "alice"},
            {"author": "bob", "repository": "org/a"},
            {"author": "mallory", "is_bot": true}
        ])));

        let engine = Engine::new(&prs, Some(&teams()), &EngineConfig::default())
            .unwrap()
            .at(now());

        assert_eq!(engine.available_authors(), vec!["alice", "bob", "carol"]);
        assert_eq!(engine.available_teams().unwrap(), vec!["core", "infra"]);
        assert_eq!(
            engine.available_repositories(),
            vec!["org/a", "org/repo", "org/z"]
        );
        assert!(engine.available_orgs().is_empty());
    }

    #[test]
    fn test_summarize_str_uses_scope_default_group() {
        let prs = RawTable::from_records(rows(json!([
            {"author": "alice"},
            {"author": "bob"}
        ])));
        let engine = Engine::new(&prs, Some(&teams()), &EngineConfig::default())
            .unwrap()
            .at(now());

        let summary = engine.summarize_str("team", Some("infra"), None).unwrap();
        assert_eq!(summary.group_by, GroupKey::Team);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.rows[0].group, "infra");

        let err = engine.summarize_str("galaxy", None, None).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidScope(_)));
    }

    #[test]
    fn test_pr_team_column_wins_over_mapping() {
        let prs = RawTable::from_records(rows(json!([
            {"author": "alice", "team": "platform"}
        ])));
        let engine = Engine::new(&prs, Some(&teams()), &EngineConfig::default())
            .unwrap()
            .at(now());

        assert_eq!(engine.available_teams().unwrap(), vec!["platform"]);
    }

    #[test]
    fn test_config_controls_filters_and_lookback() {
        let prs = RawTable::from_records(rows(json!([
            {"author": "alice", "is_fork": true},
            {"author": "bob", "created_at": "2025-12-01T00:00:00Z"}
        ])));

        let strict = Engine::new(&prs, None, &EngineConfig::default().with_lookback_days(30))
            .unwrap()
            .at(now());
        assert!(strict.available_authors().is_empty());

        let config = EngineConfig {
            filters: FilterConfig {
                exclude_forks: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let relaxed = Engine::new(&prs, None, &config).unwrap().at(now());
        assert_eq!(relaxed.available_authors(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_duplicate_policy_from_config() {
        let prs = RawTable::from_records(rows(json!([{"author": "alice"}])));
        let mapping = TeamTable::new(vec![
            crate::records::TeamMapping {
                author: "alice".to_string(),
                team: "core".to_string(),
                org: None,
            },
            crate::records::TeamMapping {
                author: "alice".to_string(),
                team: "infra".to_string(),
                org: None,
            },
        ]);

        let strict = Engine::new(&prs, Some(&mapping), &EngineConfig::default())
            .unwrap()
            .at(now());
        assert!(matches!(
            strict.available_teams(),
            Err(crate::Error::JoinAmbiguity { .. })
        ));
        assert!(strict
            .summarize(&ScopeSelection::team("core").unwrap(), GroupKey::Team)
            .is_err());
        assert_eq!(strict.available_authors(), vec!["alice"]);
        let by_repo = strict
            .summarize(&ScopeSelection::org(), GroupKey::Repository)
            .unwrap();
        assert_eq!(by_repo.len(), 1);

        let mut config = EngineConfig::default();
        config.join.duplicates = DuplicatePolicy::LastWriteWins;
        let engine = Engine::new(&prs, Some(&mapping), &config).unwrap().at(now());
        assert_eq!(engine.available_teams().unwrap(), vec!["infra"]);
    }

    #[test]
    fn test_clones_share_one_snapshot() {
        let prs = RawTable::from_records(rows(json!([{"author": "alice"}])));
        let engine = Engine::new(&prs, None, &EngineConfig::default())
            .unwrap()
            .at(now());
        let clone = engine.clone();

        assert!(std::ptr::eq(engine.derived(), clone.derived()));

        let handle = std::thread::spawn(move || {
            clone
                .summarize(&ScopeSelection::org(), GroupKey::Author)
                .unwrap()
        });
        let local = engine
            .summarize(&ScopeSelection::org(), GroupKey::Author)
            .unwrap();
        assert_eq!(handle.join().unwrap(), local);
    }
}
