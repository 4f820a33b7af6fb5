//! Repository configuration
//!
//! Layered through the `config` crate: built-in defaults, then the global
//! TOML file (`$XDG_CONFIG_HOME/jcrgraph/config.toml`) or an explicit file,
//! then `JCRGRAPH__*` environment variables.

pub mod facade;
pub mod merge {
    pub mod service;
}
pub mod paths {
    pub mod xdg_root;
}
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::cache::CacheOptions;
use crate::error::{RepositoryError, Result};
use crate::logging::LoggingConfig;
use crate::path::Path;
use crate::types::Name;
use serde::{Deserialize, Serialize};

fn default_workspace() -> String {
    "default".to_string()
}

fn default_system_workspace() -> String {
    "system".to_string()
}

fn default_locks_path() -> String {
    "/jcr:system/dna:locks".to_string()
}

fn default_true() -> bool {
    true
}

fn default_primary_type() -> String {
    "nt:unstructured".to_string()
}

fn default_lock_extension_interval_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Workspace used when a login names none
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Workspace holding lock records
    #[serde(default = "default_system_workspace")]
    pub system_workspace: String,

    #[serde(default = "default_locks_path")]
    pub locks_path: String,

    /// Keep properties no definition allows instead of dropping them
    #[serde(default = "default_true")]
    pub include_properties_without_definition: bool,

    /// Primary type of stored nodes that carry none
    #[serde(default = "default_primary_type")]
    pub default_primary_type: String,

    /// Added to the lock time to stamp a lock record's expiration date
    #[serde(default = "default_lock_extension_interval_ms")]
    pub lock_extension_interval_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            system_workspace: default_system_workspace(),
            locks_path: default_locks_path(),
            include_properties_without_definition: default_true(),
            default_primary_type: default_primary_type(),
            lock_extension_interval_ms: default_lock_extension_interval_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            include_properties_without_definition: self.include_properties_without_definition,
            default_primary_type: Name::new(self.default_primary_type.clone()),
        }
    }

    pub fn locks_path(&self) -> Result<Path> {
        let path = Path::parse(&self.locks_path)?;
        if !path.is_absolute() {
            return Err(RepositoryError::Config(format!(
                "locks_path must be absolute, got {}",
                self.locks_path
            )));
        }
        Ok(path)
    }

    pub fn lock_extension_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(
            i64::try_from(self.lock_extension_interval_ms).unwrap_or(i64::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.workspace, "default");
        assert_eq!(config.locks_path().unwrap().to_string(), "/jcr:system/dna:locks");
        let options = config.cache_options();
        assert!(options.include_properties_without_definition);
        assert_eq!(options.default_primary_type, crate::lexicon::nt::UNSTRUCTURED);
        assert_eq!(config.lock_extension_interval(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_relative_locks_path_rejected() {
        let config = RepositoryConfig {
            locks_path: "locks".to_string(),
            ..RepositoryConfig::default()
        };
        assert!(matches!(config.locks_path(), Err(RepositoryError::Config(_))));
    }
}
