//! Configuration management for embedded redis processes.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod executable;
mod network;
mod ports;
mod process;
mod sentinel;
mod topology;
pub use executable::*;
pub use network::*;
pub use ports::*;
pub use process::*;
pub use sentinel::*;
pub use topology::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

pub(crate) const ENV_PREFIX: &str = "EMBEDDED_REDIS";

/// Main configuration container
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Bind address shared by every spawned process
    #[serde(default)]
    pub network: NetworkConfig,
    /// Base ports for sequential allocation
    #[serde(default)]
    pub ports: PortsConfig,
    /// Startup and shutdown behaviour of supervised processes
    #[serde(default)]
    pub process: ProcessConfig,
    /// Defaults shared by every sentinel of a topology
    #[serde(default)]
    pub sentinel: SentinelConfig,
    /// Executable registry overrides
    #[serde(default)]
    pub executable: ExecutableConfig,
    /// Declarative cluster description used by the binary
    #[serde(default)]
    pub topology: TopologyConfig,
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `EMBEDDED_REDIS__` prefix (highest priority)
    ///
    /// # Note
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("EMBEDDED_REDIS__PROCESS__STARTUP_TIMEOUT_MS", "2000");
    /// let settings = Settings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.network.validate()?;
        self.ports.validate()?;
        self.process.validate()?;
        self.sentinel.validate()?;
        self.executable.validate()?;
        self.topology.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

pub(crate) fn invalid(message: impl Into<String>) -> crate::Error {
    crate::Error::Config(config::ConfigError::Message(message.into()))
}
