//! Config layers stacked on top of the built-in defaults

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::PathBuf;

/// Prefix of the environment overlay, e.g. `JCRGRAPH__LOGGING__LEVEL`
pub const ENV_PREFIX: &str = "JCRGRAPH";

#[derive(Debug, Clone)]
pub enum Layer {
    /// TOML file; a missing file is an error only when `required`
    Toml { path: PathBuf, required: bool },
    Environment,
}

impl Layer {
    pub fn apply(
        self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        match self {
            Layer::Toml { path, required } => {
                let name = path.to_str().ok_or_else(|| {
                    ConfigError::Message(format!("non UTF-8 config path {:?}", path))
                })?;
                Ok(builder.add_source(File::new(name, FileFormat::Toml).required(required)))
            }
            Layer::Environment => Ok(builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )),
        }
    }
}
