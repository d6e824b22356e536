//! @ai:module:intent Left-join PR records with the author to team mapping
//! @ai:module:layer application
//! @ai:module:public_api TeamIndex, JoinKey
//! @ai:module:depends_on records, config, error
//! @ai:module:stateless true

use crate::config::DuplicatePolicy;
use crate::error::{Error, Result};
use crate::records::{DerivedPr, PrRecord, TeamTable};
use crate::table::RawTable;
use std::collections::HashMap;

/// @ai:intent Which columns the team join matches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKey {
    Author,
    AuthorAndOrg,
}

/// @ai:intent Lookup from (author, org) or author alone to team
#[derive(Debug, Clone)]
pub struct TeamIndex {
    key: JoinKey,
    teams: HashMap<(String, Option<String>), String>,
}

impl TeamIndex {
    /// @ai:intent Index a mapping table for joining against PRs
    /// @ai:pre prs_have_org is true when the PR side carries non-null orgs
    /// @ai:post the key is (author, org) only when both sides carry orgs
    /// @ai:effects pure
    pub fn build(table: &TeamTable, prs_have_org: bool, duplicates: DuplicatePolicy) -> Result<Self> {
        let key = if prs_have_org && table.has_org() {
            JoinKey::AuthorAndOrg
        } else {
            JoinKey::Author
        };

        let mut teams = HashMap::with_capacity(table.mappings().len());

        for mapping in table.mappings() {
            let org = match key {
                JoinKey::AuthorAndOrg => mapping.org.clone(),
                JoinKey::Author => None,
            };
            let entry_key = (mapping.author.clone(), org);

            if let Some(previous) = teams.insert(entry_key.clone(), mapping.team.clone()) {
                if duplicates == DuplicatePolicy::Reject && previous != mapping.team {
                    return Err(Error::JoinAmbiguity {
                        author: entry_key.0,
                        org: entry_key.1,
                    });
                }
                tracing::debug!(
                    "Team mapping for {} replaced {} with {}",
                    mapping.author,
                    previous,
                    mapping.team
                );
            }
        }

        tracing::debug!("Indexed {} team mappings by {:?}", teams.len(), key);
        Ok(Self { key, teams })
    }

    /// @ai:intent Index the mapping for a PR table, unless the PR table carries its own teams
    /// @ai:post None when there is no mapping or the PR table has a `team` column
    /// @ai:effects pure
    pub fn for_prs(
        pr_table: &RawTable,
        prs: &[DerivedPr],
        teams: Option<&TeamTable>,
        duplicates: DuplicatePolicy,
    ) -> Result<Option<Self>> {
        let Some(table) = teams else {
            return Ok(None);
        };

        if pr_table.has_column("team") {
            tracing::info!("PR table carries its own team column; ignoring team mapping");
            return Ok(None);
        }

        let prs_have_org = prs.iter().any(|pr| pr.record.org.is_some());
        Self::build(table, prs_have_org, duplicates).map(Some)
    }

    pub fn key(&self) -> JoinKey {
        self.key
    }

    /// @ai:intent Team for a PR, None when the author is unmapped
    /// @ai:effects pure
    pub fn team_for(&self, record: &PrRecord) -> Option<&str> {
        let org = match self.key {
            JoinKey::AuthorAndOrg => record.org.clone(),
            JoinKey::Author => None,
        };
        self.teams
            .get(&(record.author.clone(), org))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TeamMapping;

    fn mapping(author: &str, team: &str, org: Option<&str>) -> TeamMapping {
        TeamMapping {
            author: author.to_string(),
            team: team.to_string(),
            org: org.map(str::to_string),
        }
    }

    fn pr(author: &str, org: Option<&str>) -> PrRecord {
        PrRecord {
            author: author.to_string(),
            repository: "org/repo".to_string(),
            org: org.map(str::to_string),
            team: None,
            created_at: None,
            merged_at: None,
            review_requested_at: None,
            first_reviewed_at: None,
            additions: Some(0),
            deletions: Some(0),
            is_fork: Some(false),
            is_archived: Some(false),
            is_bot: Some(false),
        }
    }

    #[test]
    fn test_join_on_author_alone_without_orgs() {
        let table = TeamTable::new(vec![mapping("alice", "core", None)]);
        let index = TeamIndex::build(&table, false, DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.key(), JoinKey::Author);
        assert_eq!(index.team_for(&pr("alice", None)), Some("core"));
        assert_eq!(index.team_for(&pr("bob", None)), None);
    }

    #[test]
    fn test_join_uses_org_when_both_sides_have_it() {
        let table = TeamTable::new(vec![
            mapping("alice", "alpha", Some("org-a")),
            mapping("alice", "beta", Some("org-b")),
        ]);
        let index = TeamIndex::build(&table, true, DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.key(), JoinKey::AuthorAndOrg);
        assert_eq!(index.team_for(&pr("alice", Some("org-a"))), Some("alpha"));
        assert_eq!(index.team_for(&pr("alice", Some("org-b"))), Some("beta"));
        assert_eq!(index.team_for(&pr("alice", None)), None);
    }

    #[test]
    fn test_join_degrades_when_prs_have_no_org() {
        let table = TeamTable::new(vec![mapping("alice", "core", Some("org-a"))]);
        let index = TeamIndex::build(&table, false, DuplicatePolicy::Reject).unwrap();

        assert_eq!(index.key(), JoinKey::Author);
        assert_eq!(index.team_for(&pr("alice", None)), Some("core"));
    }

    #[test]
    fn test_duplicate_mapping_is_rejected() {
        let table = TeamTable::new(vec![
            mapping("alice", "core", None),
            mapping("alice", "infra", None),
        ]);
        let err = TeamIndex::build(&table, false, DuplicatePolicy::Reject).unwrap_err();

        assert_eq!(
            err,
            Error::JoinAmbiguity {
                author: "alice".to_string(),
                org: None
            }
        );
    }

    #[test]
    fn test_identical_duplicate_is_not_ambiguous() {
        let table = TeamTable::new(vec![
            mapping("alice", "core", None),
            mapping("alice", "core", None),
        ]);
        assert!(TeamIndex::build(&table, false, DuplicatePolicy::Reject).is_ok());
    }

    #[test]
    fn test_last_write_wins_policy() {
        let table = TeamTable::new(vec![
            mapping("alice", "core", None),
            mapping("alice", "infra", None),
        ]);
        let index = TeamIndex::build(&table, false, DuplicatePolicy::LastWriteWins).unwrap();
        assert_eq!(index.team_for(&pr("alice", None)), Some("infra"));
    }

    #[test]
    fn test_degraded_join_detects_cross_org_conflict() {
        let table = TeamTable::new(vec![
            mapping("alice", "alpha", Some("org-a")),
            mapping("alice", "beta", Some("org-b")),
        ]);
        assert!(TeamIndex::build(&table, false, DuplicatePolicy::Reject).is_err());
    }
}
