//! @ai:module:intent Engineering metrics engine for pull-request tables
//! @ai:module:layer domain
//! @ai:module:public_api aggregate, config, derive, error, filters, join, loader, output, records, scope, table
//!
//! # Enginsights
//!
//! Derives per-PR lead time, review latency, churn, and size class from a raw
//! pull-request table, then aggregates them per individual, team, or org.
//!
//! ## Example
//!
//! ```rust,no_run
//! use enginsights::{loader, output, Engine, EngineConfig, GroupKey, ScopeSelection};
//! use std::path::Path;
//!
//! let prs = loader::load_prs(Path::new("data/prs.json")).unwrap();
//! let teams = loader::load_teams(Path::new("data/teams.csv")).unwrap();
//!
//! let engine = Engine::new(&prs, teams.as_ref(), &EngineConfig::default()).unwrap();
//! let selection = ScopeSelection::team("core").unwrap();
//! let summary = engine.summarize(&selection, GroupKey::Author).unwrap();
//! println!("{}", output::format_summary(&summary, output::OutputFormat::Text));
//! ```

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod error;
pub mod filters;
pub mod join;
pub mod loader;
pub mod output;
pub mod records;
pub mod scope;
pub mod table;

pub use aggregate::{aggregate, summarize_rows, Engine, ScopeAggregator};
pub use config::{DuplicatePolicy, EngineConfig, FilterConfig, JoinConfig, PathConfig};
pub use derive::{derive_record, MetricDeriver, MetricDeriverTrait, REQUIRED_COLUMNS};
pub use error::{Error, Result};
pub use filters::{ExclusionFilters, ExclusionPredicate, LookbackWindow};
pub use join::{JoinKey, TeamIndex};
pub use output::{format_derived, format_options, format_summary, to_json, OutputFormat};
pub use records::{
    DerivedPr, PrRecord, SizeClass, SummaryRecord, SummaryTable, TeamMapping, TeamTable,
};
pub use scope::{GroupKey, Scope, ScopeSelection};
pub use table::{RawTable, Row};
