//! @ai:module:intent Configuration structs for the metrics engine
//! @ai:module:layer infrastructure
//! @ai:module:public_api EngineConfig, FilterConfig, JoinConfig, DuplicatePolicy, PathConfig
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 180;

/// @ai:intent Main configuration for the engine
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

/// @ai:intent Toggles for the global exclusion predicates
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "enabled")]
    pub exclude_forks: bool,
    #[serde(default = "enabled")]
    pub exclude_archived: bool,
    #[serde(default = "enabled")]
    pub exclude_bots: bool,
    /// Also drop authors whose login ends in `[bot]`
    #[serde(default)]
    pub exclude_bot_logins: bool,
}

/// @ai:intent Team join configuration
/// @ai:effects pure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

/// @ai:intent What to do when the team mapping repeats an (author, org) key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    LastWriteWins,
}

/// @ai:intent Default input locations for the CLI
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_prs_path")]
    pub prs: PathBuf,
    #[serde(default = "default_teams_path")]
    pub teams: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            filters: FilterConfig::default(),
            join: JoinConfig::default(),
            paths: PathConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_forks: true,
            exclude_archived: true,
            exclude_bots: true,
            exclude_bot_logins: false,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            prs: default_prs_path(),
            teams: default_teams_path(),
        }
    }
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn enabled() -> bool {
    true
}

fn default_prs_path() -> PathBuf {
    PathBuf::from("data/prs.json")
}

fn default_teams_path() -> PathBuf {
    PathBuf::from("data/teams.csv")
}

impl EngineConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// @ai:intent Copy of this config with a different lookback window
    /// @ai:effects pure
    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_exclude_forks_archived_and_bots() {
        let config = EngineConfig::default();
        assert_eq!(config.lookback_days, 180);
        assert!(config.filters.exclude_forks);
        assert!(config.filters.exclude_archived);
        assert!(config.filters.exclude_bots);
        assert!(!config.filters.exclude_bot_logins);
        assert_eq!(config.join.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
lookback_days = 30

[join]
duplicates = "last-write-wins"
"#,
        )
        .unwrap();

        assert_eq!(config.lookback_days, 30);
        assert_eq!(config.join.duplicates, DuplicatePolicy::LastWriteWins);
        assert_eq!(config.filters, FilterConfig::default());
        assert_eq!(config.paths, PathConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("enginsights.toml");

        let config = EngineConfig::default().with_lookback_days(45);
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }
}
