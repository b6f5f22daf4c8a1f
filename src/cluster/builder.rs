//! Turns a declarative topology into wired server configurations and
//! supervised processes.
//!
//! ## Planning order
//! 1. sentinel ports (explicit list, or `sentinel_count` allocations)
//! 2. per replication group, in declaration order: the master port and
//!    configuration, then one port and configuration per replica pointing at
//!    the master's address
//! 3. one sentinel configuration per sentinel port, monitoring every group
//!
//! Every configuration error surfaces from [`ClusterBuilder::plan`] /
//! [`ClusterBuilder::build`] before any process is spawned.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::Cluster;
use crate::BuildError;
use crate::EphemeralPortProvider;
use crate::ExecutableResolver;
use crate::ManagedProcess;
use crate::PortProvider;
use crate::PredefinedPortProvider;
use crate::ProcessOptions;
use crate::ReplicationDirective;
use crate::Result;
use crate::SentinelConfig;
use crate::SentinelMonitor;
use crate::SequencePortProvider;
use crate::ServerConfig;
use crate::ServerProcess;
use crate::ServerRole;
use crate::Settings;

/// Sentinel count used when neither a count nor explicit ports are given.
pub const DEFAULT_SENTINEL_COUNT: usize = 1;

/// One master plus `replicas` replicas, monitored under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationGroup {
    pub name: String,
    pub replicas: usize,
    /// Overrides the topology-wide quorum for this group
    pub quorum: Option<usize>,
}

/// Fully wired configurations of a cluster, in creation order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub sentinels: Vec<ServerConfig>,
    /// Masters and replicas; every master precedes its replicas
    pub servers: Vec<ServerConfig>,
}

impl Topology {
    pub fn masters(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|c| c.role() == ServerRole::Master)
    }

    pub fn replicas(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|c| c.role() == ServerRole::Replica)
    }
}

pub struct ClusterBuilder {
    resolver: ExecutableResolver,
    options: ProcessOptions,
    bind: String,
    sentinel_defaults: SentinelConfig,
    sentinel_count: Option<usize>,
    sentinel_ports: Option<Vec<u16>>,
    quorum: Option<usize>,
    groups: Vec<ReplicationGroup>,
    replication_directive: ReplicationDirective,
    ephemeral: bool,
    server_base: u16,
    sentinel_base: u16,
    server_port_provider: Option<Arc<dyn PortProvider>>,
    sentinel_port_provider: Option<Arc<dyn PortProvider>>,
}

impl Default for ClusterBuilder {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            resolver: ExecutableResolver::from_settings(&settings),
            options: ProcessOptions::from_config(&settings.process),
            bind: settings.network.bind,
            sentinel_defaults: settings.sentinel,
            sentinel_count: None,
            sentinel_ports: None,
            quorum: None,
            groups: Vec::new(),
            replication_directive: ReplicationDirective::default(),
            ephemeral: false,
            server_base: settings.ports.server_base,
            sentinel_base: settings.ports.sentinel_base,
            server_port_provider: None,
            sentinel_port_provider: None,
        }
    }
}

impl ClusterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder carrying every section of `settings`, including its topology.
    pub fn from_settings(settings: &Settings) -> Self {
        let topology = &settings.topology;
        let mut builder = Self {
            resolver: ExecutableResolver::from_settings(settings),
            options: ProcessOptions::from_config(&settings.process),
            bind: settings.network.bind.clone(),
            sentinel_defaults: settings.sentinel.clone(),
            sentinel_count: topology.sentinel_count,
            sentinel_ports: None,
            quorum: topology.quorum,
            groups: Vec::new(),
            replication_directive: ReplicationDirective::default(),
            ephemeral: topology.ephemeral,
            server_base: settings.ports.server_base,
            sentinel_base: settings.ports.sentinel_base,
            server_port_provider: None,
            sentinel_port_provider: None,
        };
        if !topology.sentinel_ports.is_empty() {
            builder.sentinel_ports = Some(topology.sentinel_ports.clone());
        }
        for group in &topology.groups {
            builder.groups.push(ReplicationGroup {
                name: group.name.clone(),
                replicas: group.replicas,
                quorum: group.quorum,
            });
        }
        builder
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

    /// Address every server binds to and replicas/sentinels point at.
    pub fn bind(
        mut self,
        bind: impl Into<String>,
    ) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn sentinel_defaults(
        mut self,
        defaults: SentinelConfig,
    ) -> Self {
        self.sentinel_defaults = defaults;
        self
    }

    /// Allocates `count` sentinel ports; exclusive with [`Self::sentinel_ports`].
    pub fn sentinel_count(
        mut self,
        count: usize,
    ) -> Self {
        self.sentinel_count = Some(count);
        self
    }

    /// One sentinel per listed port; exclusive with [`Self::sentinel_count`].
    pub fn sentinel_ports(
        mut self,
        ports: impl IntoIterator<Item = u16>,
    ) -> Self {
        self.sentinel_ports = Some(ports.into_iter().collect());
        self
    }

    /// Quorum of every group without its own override.
    pub fn quorum(
        mut self,
        quorum: usize,
    ) -> Self {
        self.quorum = Some(quorum);
        self
    }

    pub fn replication_group(
        self,
        name: impl Into<String>,
        replicas: usize,
    ) -> Self {
        self.add_group(name.into(), replicas, None)
    }

    /// Directive replicas use to name their master; `SlaveOf` for redis
    /// older than 5.0.
    pub fn replication_directive(
        mut self,
        directive: ReplicationDirective,
    ) -> Self {
        self.replication_directive = directive;
        self
    }

    pub fn replication_group_with_quorum(
        self,
        name: impl Into<String>,
        replicas: usize,
        quorum: usize,
    ) -> Self {
        self.add_group(name.into(), replicas, Some(quorum))
    }

    fn add_group(
        mut self,
        name: String,
        replicas: usize,
        quorum: Option<usize>,
    ) -> Self {
        self.groups.push(ReplicationGroup {
            name,
            replicas,
            quorum,
        });
        self
    }

    /// Lets the OS pick unused ports for every member.
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Masters and replicas take their ports from this list, in order.
    pub fn server_ports(
        self,
        ports: impl IntoIterator<Item = u16>,
    ) -> Self {
        self.server_port_provider(Arc::new(PredefinedPortProvider::new(ports)))
    }

    pub fn server_port_provider(
        mut self,
        provider: Arc<dyn PortProvider>,
    ) -> Self {
        self.server_port_provider = Some(provider);
        self
    }

    /// Source of ports when only a sentinel count is given.
    pub fn sentinel_port_provider(
        mut self,
        provider: Arc<dyn PortProvider>,
    ) -> Self {
        self.sentinel_port_provider = Some(provider);
        self
    }

    fn effective_quorum(
        &self,
        group: &ReplicationGroup,
    ) -> usize {
        group
            .quorum
            .or(self.quorum)
            .unwrap_or(self.sentinel_defaults.quorum)
    }

    fn validate(&self) -> Result<usize> {
        let sentinels = match (self.sentinel_count, &self.sentinel_ports) {
            (Some(_), Some(_)) => {
                return Err(BuildError::InvalidConfig(
                    "sentinel count and explicit sentinel ports are mutually exclusive".into(),
                )
                .into())
            }
            (Some(count), None) => count,
            (None, Some(ports)) => ports.len(),
            (None, None) => DEFAULT_SENTINEL_COUNT,
        };

        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() || group.name.contains(char::is_whitespace) {
                return Err(BuildError::InvalidConfig(format!(
                    "invalid replication group name {:?}",
                    group.name
                ))
                .into());
            }
            if !names.insert(group.name.as_str()) {
                return Err(BuildError::DuplicateGroupName(group.name.clone()).into());
            }

            let quorum = self.effective_quorum(group);
            if quorum == 0 {
                return Err(BuildError::InvalidConfig(format!(
                    "quorum of group {} must be at least 1",
                    group.name
                ))
                .into());
            }
            // without sentinels only an explicitly requested quorum is an error
            let explicit = group.quorum.or(self.quorum).is_some();
            if (sentinels > 0 || explicit) && quorum > sentinels {
                return Err(BuildError::QuorumExceedsSentinelCount {
                    group: group.name.clone(),
                    quorum,
                    sentinels,
                }
                .into());
            }
        }
        if let Some(ports) = &self.sentinel_ports {
            let mut seen = HashSet::new();
            if let Some(port) = ports.iter().find(|p| **p == 0 || !seen.insert(**p)) {
                return Err(BuildError::InvalidConfig(format!(
                    "sentinel port {port} is zero or listed twice"
                ))
                .into());
            }
        }
        Ok(sentinels)
    }

    fn port_providers(&self) -> (Arc<dyn PortProvider>, Arc<dyn PortProvider>) {
        let ephemeral: Option<Arc<dyn PortProvider>> = if self.ephemeral {
            Some(Arc::new(EphemeralPortProvider::new()))
        } else {
            None
        };

        let servers = self
            .server_port_provider
            .clone()
            .or_else(|| ephemeral.clone())
            .unwrap_or_else(|| Arc::new(SequencePortProvider::new(self.server_base)));
        let sentinels = self
            .sentinel_port_provider
            .clone()
            .or(ephemeral)
            .unwrap_or_else(|| Arc::new(SequencePortProvider::new(self.sentinel_base)));
        (servers, sentinels)
    }

    /// Validates the description and allocates ports into wired configurations.
    ///
    /// # Errors
    /// `DuplicateGroupName`, `QuorumExceedsSentinelCount`, `PortsExhausted`
    /// and `InvalidConfig`; nothing is spawned either way.
    pub fn plan(&self) -> Result<Topology> {
        let sentinel_count = self.validate()?;
        let (server_ports, sentinel_ports) = self.port_providers();

        let sentinel_ports = match &self.sentinel_ports {
            Some(ports) => ports.clone(),
            None => (0..sentinel_count)
                .map(|_| sentinel_ports.next())
                .collect::<Result<Vec<u16>>>()?,
        };

        let mut topology = Topology::default();
        let mut monitors = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let master_port = server_ports.next()?;
            topology.servers.push(
                ServerConfig::builder(ServerRole::Master)
                    .bind(self.bind.clone())
                    .port(master_port)
                    .build()?,
            );

            for _ in 0..group.replicas {
                topology.servers.push(
                    ServerConfig::builder(ServerRole::Replica)
                        .bind(self.bind.clone())
                        .port(server_ports.next()?)
                        .replica_of(self.bind.clone(), master_port)
                        .replication_directive(self.replication_directive)
                        .build()?,
                );
            }

            monitors.push(SentinelMonitor {
                group: group.name.clone(),
                host: self.bind.clone(),
                port: master_port,
                quorum: self.effective_quorum(group),
            });
            debug!(
                "planned group {} with master on port {} and {} replica(s)",
                group.name, master_port, group.replicas
            );
        }

        if let Some(port) = sentinel_ports
            .iter()
            .find(|p| topology.servers.iter().any(|s| s.ports().contains(*p)))
        {
            return Err(BuildError::InvalidConfig(format!(
                "sentinel port {port} is also used by a server"
            ))
            .into());
        }

        for port in sentinel_ports {
            let sentinel = monitors.iter().cloned().fold(
                ServerConfig::builder(ServerRole::Sentinel)
                    .bind(self.bind.clone())
                    .port(port)
                    .sentinel_defaults(self.sentinel_defaults.clone()),
                |builder, monitor| builder.monitor(monitor),
            );
            topology.sentinels.push(sentinel.build()?);
        }

        Ok(topology)
    }

    /// Plans the topology, resolves the executable and wraps every
    /// configuration in a supervised process. Nothing is started.
    pub fn build(self) -> Result<Cluster> {
        let topology = self.plan()?;
        let executable = self.resolver.resolve()?;

        let supervise = |config: &ServerConfig| -> Arc<dyn ManagedProcess> {
            Arc::new(ServerProcess::new(
                config.clone(),
                executable.clone(),
                self.options.clone(),
            ))
        };
        let sentinels = topology.sentinels.iter().map(supervise).collect();
        let servers = topology.servers.iter().map(supervise).collect();

        info!(
            "built cluster with {} sentinel(s) and {} server(s)",
            topology.sentinels.len(),
            topology.servers.len()
        );
        Ok(Cluster::new(sentinels, servers).with_topology(topology))
    }
}
