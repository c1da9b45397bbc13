use serde::{Deserialize, Serialize};

use crate::common::AnyResult;
use crate::configs::*;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to
    /// built-in defaults when no file is present.
    pub fn load() -> AnyResult<Self> {
        let config_path = "config.toml";
        if !std::path::Path::new(config_path).exists() {
            return Ok(Self::default());
        }

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }
}
