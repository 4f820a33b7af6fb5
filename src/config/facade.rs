//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::RepositoryConfig;
use crate::error::Result;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file (if any) and environment.
    pub fn load() -> Result<RepositoryConfig> {
        Ok(MergeService::load()?)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<RepositoryConfig> {
        Ok(MergeService::load_from_file(path)?)
    }

    /// Create default configuration.
    pub fn default() -> RepositoryConfig {
        RepositoryConfig::default()
    }
}
