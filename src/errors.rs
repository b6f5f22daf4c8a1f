//! Error hierarchy for provisioning ephemeral redis processes.
//!
//! Errors are grouped by the phase in which they surface: building a topology,
//! starting a process, and tearing processes down. Low-level IO errors are
//! always wrapped into one of these categories rather than passed through raw.

use std::process::ExitStatus;
use std::time::Duration;

use config::ConfigError;

use crate::platform::Platform;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Detected while assembling configurations, before anything is spawned
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A single process failed to come up
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// Failures collected while stopping processes
    #[error(transparent)]
    Teardown(#[from] TeardownError),

    /// Misuse of the API by the caller, e.g. starting a running process
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No redis executable found for {platform}")]
    ExecutableNotFound { platform: Platform },

    #[error("Run out of redis ports")]
    PortsExhausted,

    #[error("Quorum {quorum} of group {group} exceeds sentinel count {sentinels}")]
    QuorumExceedsSentinelCount {
        group: String,
        quorum: usize,
        sentinels: usize,
    },

    #[error("Duplicate replication group name: {0}")]
    DuplicateGroupName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid readiness pattern")]
    InvalidReadinessPattern(#[from] regex::Error),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to spawn {name}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited before its readiness line appeared
    #[error("{name} exited before it was ready (status: {status:?}):\n{output}")]
    Failed {
        name: String,
        status: Option<ExitStatus>,
        output: String,
    },

    #[error("{name} was not ready after {timeout:?}:\n{output}")]
    Timeout {
        name: String,
        timeout: Duration,
        output: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("Failed to stop {name}: {source}")]
    Stop {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{count} member(s) failed to stop: {0:?}", count = .0.len())]
    Cluster(Vec<Error>),
}

impl BuildError {
    pub(crate) fn io(
        context: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }
}

impl Error {
    /// Returns the captured process output when the error carries one.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::Startup(StartupError::Failed { output, .. })
            | Error::Startup(StartupError::Timeout { output, .. }) => Some(output),
            _ => None,
        }
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Build(BuildError::InvalidReadinessPattern(e))
    }
}
