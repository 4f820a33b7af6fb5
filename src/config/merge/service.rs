//! MergeService: orchestrates sources and deserializes to RepositoryConfig.

use crate::config::sources::Layer;
use crate::config::{xdg, RepositoryConfig};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = RepositoryConfig::default();
        Config::builder()
            .set_default("workspace", defaults.workspace)?
            .set_default("system_workspace", defaults.system_workspace)?
            .set_default("locks_path", defaults.locks_path)?
            .set_default(
                "include_properties_without_definition",
                defaults.include_properties_without_definition,
            )?
            .set_default("default_primary_type", defaults.default_primary_type)?
            .set_default("lock_extension_interval_ms", defaults.lock_extension_interval_ms)
    }

    fn merge(layers: Vec<Layer>) -> Result<RepositoryConfig, ConfigError> {
        let builder = layers
            .into_iter()
            .try_fold(Self::builder_with_defaults()?, |builder, layer| {
                layer.apply(builder)
            })?;
        builder.build()?.try_deserialize()
    }

    /// Load config from standard sources.
    /// Precedence: defaults (lowest) -> global file -> environment (highest).
    pub fn load() -> Result<RepositoryConfig, ConfigError> {
        let mut layers = Vec::new();
        if let Some(path) = xdg::config_file() {
            layers.push(Layer::Toml {
                path,
                required: false,
            });
        }
        layers.push(Layer::Environment);
        Self::merge(layers)
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<RepositoryConfig, ConfigError> {
        Self::merge(vec![
            Layer::Toml {
                path: path.to_path_buf(),
                required: true,
            },
            Layer::Environment,
        ])
    }
}
