use std::path::Path;

use chrono::FixedOffset;
use config::{Config, Environment, File, FileFormat};
use database_layer::PoolConfig;
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable prefix; `CARELEDGER__DATABASE__URL` sets `database.url`
pub const ENV_PREFIX: &str = "CARELEDGER";

/// File name looked up when no explicit path is given
pub const DEFAULT_CONFIG_NAME: &str = "careledger";

/// Hospital-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalSettings {
    pub name: String,
    /// Fixed UTC offset of the hospital's wall clock, e.g. `+03:00`
    pub utc_offset: String,
}

impl Default for HospitalSettings {
    fn default() -> Self {
        Self {
            name: "CareLedger Hospital".to_string(),
            // Africa/Nairobi, no daylight saving
            utc_offset: "+03:00".to_string(),
        }
    }
}

impl HospitalSettings {
    pub fn offset(&self) -> ConfigResult<FixedOffset> {
        self.utc_offset.trim().parse::<FixedOffset>().map_err(|e| {
            ConfigError::ValidationError(format!(
                "hospital.utc_offset '{}' is not a ±HH:MM offset: {}",
                self.utc_offset, e
            ))
        })
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hospital: HospitalSettings,
    pub database: PoolConfig,
    pub logging: LoggerConfig,
}

impl EngineConfig {
    /// Load defaults, then the config file, then environment overrides.
    ///
    /// An explicit `path` must exist; otherwise `careledger.{yaml,toml,json}`
    /// in the working directory is used when present.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(settings)
    }

    /// Load from an in-memory YAML document (no environment overlay)
    pub fn from_yaml(document: &str) -> ConfigResult<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(document, FileFormat::Yaml))
            .build()?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> ConfigResult<Self> {
        let engine: EngineConfig = settings.try_deserialize()?;
        engine.validate()?;
        debug!(hospital = %engine.hospital.name, offset = %engine.hospital.utc_offset, "Configuration loaded");
        Ok(engine)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.hospital.offset()?;

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.url must not be empty".to_string()));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::ValidationError(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        Ok(())
    }
}
