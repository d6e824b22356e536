//! @ai:module:intent Global exclusion predicates and the lookback window
//! @ai:module:layer application
//! @ai:module:public_api ExclusionPredicate, ExclusionFilters, ExcludeForks, ExcludeArchived, ExcludeBots, ExcludeBotLogins, LookbackWindow
//! @ai:module:depends_on config, records
//! @ai:module:stateless true

use crate::config::FilterConfig;
use crate::records::PrRecord;
use chrono::{DateTime, TimeDelta, Utc};

/// @ai:intent A named rule that removes a PR from every summary
///
/// Flag predicates treat a null flag as excluded: the row cannot be shown to pass.
pub trait ExclusionPredicate: Send + Sync {
    /// @ai:intent Stable name used in logs
    fn name(&self) -> &'static str;

    /// @ai:intent True when the record must be dropped
    fn excludes(&self, record: &PrRecord) -> bool;
}

/// @ai:intent Drop PRs from forked repositories
pub struct ExcludeForks;

impl ExclusionPredicate for ExcludeForks {
    fn name(&self) -> &'static str {
        "forks"
    }

    fn excludes(&self, record: &PrRecord) -> bool {
        record.is_fork != Some(false)
    }
}

/// @ai:intent Drop PRs from archived repositories
pub struct ExcludeArchived;

impl ExclusionPredicate for ExcludeArchived {
    fn name(&self) -> &'static str {
        "archived"
    }

    fn excludes(&self, record: &PrRecord) -> bool {
        record.is_archived != Some(false)
    }
}

/// @ai:intent Drop PRs flagged as authored by a bot
pub struct ExcludeBots;

impl ExclusionPredicate for ExcludeBots {
    fn name(&self) -> &'static str {
        "bots"
    }

    fn excludes(&self, record: &PrRecord) -> bool {
        record.is_bot != Some(false)
    }
}

/// @ai:intent Drop PRs whose author login carries the `[bot]` suffix
pub struct ExcludeBotLogins;

impl ExclusionPredicate for ExcludeBotLogins {
    fn name(&self) -> &'static str {
        "bot-logins"
    }

    fn excludes(&self, record: &PrRecord) -> bool {
        record.author.ends_with("[bot]")
    }
}

/// @ai:intent Ordered list of exclusion predicates; a row survives only if no predicate excludes it
pub struct ExclusionFilters {
    predicates: Vec<Box<dyn ExclusionPredicate>>,
}

impl ExclusionFilters {
    /// @ai:intent Empty filter list that admits every row
    /// @ai:effects pure
    pub fn none() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// @ai:intent Build the predicate list in fixed order: forks, archived, bots, bot logins
    /// @ai:effects pure
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut filters = Self::none();

        if config.exclude_forks {
            filters.push(ExcludeForks);
        }
        if config.exclude_archived {
            filters.push(ExcludeArchived);
        }
        if config.exclude_bots {
            filters.push(ExcludeBots);
        }
        if config.exclude_bot_logins {
            filters.push(ExcludeBotLogins);
        }

        filters
    }

    /// @ai:intent Append a predicate after the existing ones
    /// @ai:effects pure
    pub fn push(&mut self, predicate: impl ExclusionPredicate + 'static) {
        self.predicates.push(Box::new(predicate));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    /// @ai:intent True when no predicate excludes the record
    /// @ai:effects pure
    pub fn admits(&self, record: &PrRecord) -> bool {
        self.predicates.iter().all(|p| !p.excludes(record))
    }
}

impl Default for ExclusionFilters {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl std::fmt::Debug for ExclusionFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// @ai:intent Window of PR creation times ending at a pinned "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    /// None when the window reaches past the earliest representable time
    cutoff: Option<DateTime<Utc>>,
}

impl LookbackWindow {
    /// @ai:intent Window covering `days` days before `now`
    /// @ai:effects pure
    pub fn new(now: DateTime<Utc>, days: u32) -> Self {
        let cutoff = TimeDelta::try_days(i64::from(days)).and_then(|d| now.checked_sub_signed(d));
        Self { cutoff }
    }

    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.cutoff
    }

    /// @ai:intent True when the PR was created at or after the cutoff
    /// @ai:post records without a creation time fall outside every window
    /// @ai:effects pure
    pub fn contains(&self, record: &PrRecord) -> bool {
        match (record.created_at, self.cutoff) {
            (Some(created), Some(cutoff)) => created >= cutoff,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
