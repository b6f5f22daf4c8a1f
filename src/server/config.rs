use std::fmt;

use super::ServerRole;
use crate::BuildError;
use crate::Result;
use crate::SentinelConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1";

/// How the configuration reaches the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    /// Rendered into a file whose path is the first argument
    #[default]
    ConfigFile,
    /// Passed as `--key value` argument tokens
    Inline,
}

/// Directive a replica uses to name its master.
///
/// `replicaof` needs redis 5.0 or later; older servers only understand
/// `slaveof`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicationDirective {
    #[default]
    ReplicaOf,
    SlaveOf,
}

impl ReplicationDirective {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationDirective::ReplicaOf => "replicaof",
            ReplicationDirective::SlaveOf => "slaveof",
        }
    }
}

/// Address a replica replicates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterAddress {
    pub host: String,
    pub port: u16,
}

/// One `sentinel monitor` entry: a replication group watched by a sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelMonitor {
    pub group: String,
    pub host: String,
    pub port: u16,
    pub quorum: usize,
}

/// Immutable description of one redis process.
///
/// Built through [`ServerConfig::builder`]; at least one of the primary port
/// and the TLS port is non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    role: ServerRole,
    bind: String,
    port: u16,
    tls_port: Option<u16>,
    settings: Vec<String>,
    replica_of: Option<MasterAddress>,
    replication_directive: ReplicationDirective,
    monitors: Vec<SentinelMonitor>,
    sentinel: SentinelConfig,
    launch_mode: LaunchMode,
}

#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    role: ServerRole,
    bind: String,
    port: u16,
    tls_port: Option<u16>,
    settings: Vec<String>,
    replica_of: Option<MasterAddress>,
    replication_directive: ReplicationDirective,
    monitors: Vec<SentinelMonitor>,
    sentinel: SentinelConfig,
    launch_mode: LaunchMode,
}

impl ServerConfig {
    pub fn builder(role: ServerRole) -> ServerConfigBuilder {
        ServerConfigBuilder {
            role,
            bind: DEFAULT_BIND.into(),
            port: 0,
            tls_port: None,
            settings: Vec::new(),
            replica_of: None,
            replication_directive: ReplicationDirective::default(),
            monitors: Vec::new(),
            sentinel: SentinelConfig::default(),
            launch_mode: LaunchMode::default(),
        }
    }

    pub fn role(&self) -> ServerRole {
        self.role
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    /// Primary port, 0 when plain TCP is disabled.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tls_port(&self) -> Option<u16> {
        self.tls_port
    }

    pub fn settings(&self) -> &[String] {
        &self.settings
    }

    pub fn replica_of(&self) -> Option<&MasterAddress> {
        self.replica_of.as_ref()
    }

    pub fn replication_directive(&self) -> ReplicationDirective {
        self.replication_directive
    }

    pub fn monitors(&self) -> &[SentinelMonitor] {
        &self.monitors
    }

    pub fn sentinel(&self) -> &SentinelConfig {
        &self.sentinel
    }

    pub fn launch_mode(&self) -> LaunchMode {
        self.launch_mode
    }

    /// Every non-zero port the process listens on, primary first.
    pub fn ports(&self) -> Vec<u16> {
        std::iter::once(self.port)
            .chain(self.tls_port)
            .filter(|p| *p != 0)
            .collect()
    }

    /// Human readable label used in logs and errors, e.g. `replica@127.0.0.1:6380`.
    pub fn label(&self) -> String {
        let port = self.ports().first().copied().unwrap_or(0);
        format!("{}@{}:{}", self.role, self.bind, port)
    }
}

impl ServerConfigBuilder {
    pub fn bind(
        mut self,
        bind: impl Into<String>,
    ) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn port(
        mut self,
        port: u16,
    ) -> Self {
        self.port = port;
        self
    }

    pub fn tls_port(
        mut self,
        port: u16,
    ) -> Self {
        self.tls_port = Some(port);
        self
    }

    /// Free-form `key value...` line passed to the server untouched.
    pub fn setting(
        mut self,
        line: impl Into<String>,
    ) -> Self {
        self.settings.push(line.into());
        self
    }

    pub fn replica_of(
        mut self,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        self.replica_of = Some(MasterAddress {
            host: host.into(),
            port,
        });
        self
    }

    pub fn replication_directive(
        mut self,
        directive: ReplicationDirective,
    ) -> Self {
        self.replication_directive = directive;
        self
    }

    pub fn monitor(
        mut self,
        monitor: SentinelMonitor,
    ) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn sentinel_defaults(
        mut self,
        sentinel: SentinelConfig,
    ) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn launch_mode(
        mut self,
        mode: LaunchMode,
    ) -> Self {
        self.launch_mode = mode;
        self
    }

    pub fn build(self) -> Result<ServerConfig> {
        let invalid = |msg: String| -> crate::Error { BuildError::InvalidConfig(msg).into() };

        if self.port == 0 && self.tls_port.unwrap_or(0) == 0 {
            return Err(invalid(format!(
                "{} needs a non-zero port or tls port",
                self.role
            )));
        }
        if self.bind.trim().is_empty() {
            return Err(invalid(format!("{} needs a bind address", self.role)));
        }
        if let Some(line) = self.settings.iter().find(|l| l.trim().is_empty()) {
            return Err(invalid(format!("empty setting line {line:?}")));
        }

        match self.role {
            ServerRole::Replica if self.replica_of.is_none() => {
                return Err(invalid("replica needs the address of its master".into()));
            }
            ServerRole::Sentinel if self.port == 0 => {
                return Err(invalid("sentinel needs a non-zero port".into()));
            }
            _ => {}
        }
        if self.role != ServerRole::Replica && self.replica_of.is_some() {
            return Err(invalid(format!("{} cannot replicate from a master", self.role)));
        }
        if !self.role.is_sentinel() && !self.monitors.is_empty() {
            return Err(invalid(format!("{} cannot monitor groups", self.role)));
        }

        let launch_mode = if self.role.is_sentinel() {
            // sentinels rewrite their own config file
            LaunchMode::ConfigFile
        } else {
            self.launch_mode
        };

        Ok(ServerConfig {
            role: self.role,
            bind: self.bind,
            port: self.port,
            tls_port: self.tls_port,
            settings: self.settings,
            replica_of: self.replica_of,
            replication_directive: self.replication_directive,
            monitors: self.monitors,
            sentinel: self.sentinel,
            launch_mode,
        })
    }
}

impl fmt::Display for MasterAddress {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
