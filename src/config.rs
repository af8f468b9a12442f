//! Configuration loading and management
//!
//! Handles parsing of `.crew.toml` in the store root.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::team::{MAX_CAPACITY, MIN_CAPACITY};

/// Name of the configuration file inside the store root
pub const CONFIG_FILE: &str = ".crew.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store behaviour
    #[serde(default)]
    pub store: StoreConfig,

    /// Caller identity defaults
    #[serde(default)]
    pub user: UserConfig,

    /// Member defaults
    #[serde(default)]
    pub members: MembersConfig,

    /// Dashboard settings
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Load balancer settings
    #[serde(default)]
    pub balance: BalanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// How long to wait for a team lock before giving up
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Identity used when neither `--user`, `CREW_USER` nor a session is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersConfig {
    /// Capacity given to members added without an explicit one
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
}

fn default_capacity() -> u32 {
    3
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Number of activity entries shown on the dashboard
    #[serde(default = "default_recent_activity")]
    pub recent_activity: usize,
}

fn default_recent_activity() -> usize {
    5
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            recent_activity: default_recent_activity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Record auto-assignments in the activity log
    #[serde(default = "default_true")]
    pub audit_auto_assign: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            audit_auto_assign: true,
        }
    }
}

impl Config {
    /// Load configuration from a `.crew.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the store root, or return defaults
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.store.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        let capacity = self.members.default_capacity;
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "members.default_capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}"
            )));
        }
        if let Some(user) = &self.user.default {
            if user.trim().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "user.default cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from_root(dir.path());
        assert_eq!(cfg.store.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
        assert_eq!(cfg.members.default_capacity, 3);
        assert_eq!(cfg.dashboard.recent_activity, 5);
        assert!(cfg.balance.audit_auto_assign);
        assert!(cfg.user.default.is_none());
    }

    #[test]
    fn parses_sections() {
        let dir = tempfile::tempdir().unwrap();
        let content = r#"
[user]
default = "alice"

[members]
default_capacity = 5

[balance]
audit_auto_assign = false
"#;
        fs::write(dir.path().join(CONFIG_FILE), content).unwrap();

        let cfg = Config::load_from_root(dir.path());
        assert_eq!(cfg.user.default.as_deref(), Some("alice"));
        assert_eq!(cfg.members.default_capacity, 5);
        assert!(!cfg.balance.audit_auto_assign);
        assert_eq!(cfg.dashboard.recent_activity, 5);
    }

    #[test]
    fn out_of_range_capacity_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[members]\ndefault_capacity = 9\n",
        )
        .unwrap();

        let cfg = Config::load_from_root(dir.path());
        assert_eq!(cfg.members.default_capacity, 3);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.dashboard.recent_activity = 8;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.dashboard.recent_activity, 8);
    }
}
