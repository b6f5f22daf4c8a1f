//! Fluent construction of a single standalone [`ServerProcess`].
//!
//! ## Example
//! ```ignore
//! let server = ServerBuilder::new()
//!     .port(6380)
//!     .setting("appendonly no")
//!     .build()?;
//! server.start().await?;
//! ```

use std::time::Duration;

use super::ProcessOptions;
use super::ReadinessDetector;
use super::ServerProcess;
use crate::ExecutableResolver;
use crate::LaunchMode;
use crate::Result;
use crate::ServerConfig;
use crate::ServerRole;
use crate::Settings;

pub struct ServerBuilder {
    resolver: ExecutableResolver,
    options: ProcessOptions,
    config: crate::ServerConfigBuilder,
    readiness_pattern: Option<String>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port, bind address, executable registry and process options come from
    /// `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            resolver: ExecutableResolver::from_settings(settings),
            options: ProcessOptions::from_config(&settings.process),
            config: ServerConfig::builder(ServerRole::Standalone)
                .bind(settings.network.bind.clone())
                .port(settings.ports.server_base),
            readiness_pattern: None,
        }
    }

    pub fn resolver(
        mut self,
        resolver: ExecutableResolver,
    ) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(
        mut self,
        options: ProcessOptions,
    ) -> Self {
        self.options = options;
        self
    }

    pub fn startup_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.options = self.options.startup_timeout(timeout);
        self
    }

    pub fn port(
        mut self,
        port: u16,
    ) -> Self {
        self.config = self.config.port(port);
        self
    }

    pub fn bind(
        mut self,
        bind: impl Into<String>,
    ) -> Self {
        self.config = self.config.bind(bind);
        self
    }

    pub fn tls_port(
        mut self,
        port: u16,
    ) -> Self {
        self.config = self.config.tls_port(port);
        self
    }

    /// Appends one free-form configuration line, e.g. `maxmemory 64M`.
    pub fn setting(
        mut self,
        line: impl Into<String>,
    ) -> Self {
        self.config = self.config.setting(line);
        self
    }

    pub fn launch_mode(
        mut self,
        mode: LaunchMode,
    ) -> Self {
        self.config = self.config.launch_mode(mode);
        self
    }

    /// Overrides the readiness pattern, e.g. for a patched server build.
    pub fn readiness_pattern(
        mut self,
        pattern: impl Into<String>,
    ) -> Self {
        self.readiness_pattern = Some(pattern.into());
        self
    }

    /// Validates the configuration and resolves the executable.
    ///
    /// No process is spawned.
    pub fn build(self) -> Result<ServerProcess> {
        let config = self.config.build()?;
        let executable = self.resolver.resolve()?;
        let process = ServerProcess::new(config, executable, self.options);

        match self.readiness_pattern {
            Some(pattern) => Ok(process.with_detector(ReadinessDetector::new(&pattern)?)),
            None => Ok(process),
        }
    }
}
