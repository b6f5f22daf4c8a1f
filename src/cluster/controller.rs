use std::sync::Arc;

use tracing::error;
use tracing::info;
use tracing::warn;

use super::ClusterBuilder;
use super::Topology;
use crate::ManagedProcess;
use crate::Result;
use crate::TeardownError;

/// Aggregate control over the sentinels and servers of one topology.
///
/// Servers are started before the sentinels that monitor them and stopped
/// after them, so sentinels never observe a master that is missing.
pub struct Cluster {
    sentinels: Vec<Arc<dyn ManagedProcess>>,
    servers: Vec<Arc<dyn ManagedProcess>>,
    topology: Option<Topology>,
}

impl Cluster {
    pub fn builder() -> ClusterBuilder {
        ClusterBuilder::new()
    }

    pub fn new(
        sentinels: Vec<Arc<dyn ManagedProcess>>,
        servers: Vec<Arc<dyn ManagedProcess>>,
    ) -> Self {
        Self {
            sentinels,
            servers,
            topology: None,
        }
    }

    pub(crate) fn with_topology(
        mut self,
        topology: Topology,
    ) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Configurations the members were built from, if built by
    /// [`ClusterBuilder`].
    pub fn topology(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Starts every server in creation order, then every sentinel.
    ///
    /// Stops at the first failure; members already started keep running
    /// until [`Cluster::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        for member in self.servers.iter().chain(self.sentinels.iter()) {
            if let Err(e) = member.start().await {
                error!("failed to start {}: {}", member.name(), e);
                return Err(e);
            }
        }
        info!("cluster started: ports {:?}", self.ports());
        Ok(())
    }

    /// Stops every sentinel, then every server, both in reverse creation
    /// order.
    ///
    /// Every member is attempted; failures are returned together as
    /// [`TeardownError::Cluster`].
    pub async fn stop(&self) -> Result<()> {
        let mut errors = Vec::new();
        for member in self.sentinels.iter().rev().chain(self.servers.iter().rev()) {
            if let Err(e) = member.stop().await {
                warn!("failed to stop {}: {}", member.name(), e);
                errors.push(e);
            }
        }

        if errors.is_empty() {
            info!("cluster stopped");
            Ok(())
        } else {
            Err(TeardownError::Cluster(errors).into())
        }
    }

    /// True only while every member is active; a cluster without members
    /// is never active.
    pub fn is_active(&self) -> bool {
        self.members().next().is_some() && self.members().all(|m| m.is_active())
    }

    pub fn sentinels(&self) -> &[Arc<dyn ManagedProcess>] {
        &self.sentinels
    }

    pub fn servers(&self) -> &[Arc<dyn ManagedProcess>] {
        &self.servers
    }

    /// Sentinels followed by servers.
    pub fn members(&self) -> impl Iterator<Item = &Arc<dyn ManagedProcess>> {
        self.sentinels.iter().chain(self.servers.iter())
    }

    pub fn sentinel_ports(&self) -> Vec<u16> {
        self.sentinels.iter().flat_map(|m| m.ports()).collect()
    }

    pub fn server_ports(&self) -> Vec<u16> {
        self.servers.iter().flat_map(|m| m.ports()).collect()
    }

    pub fn ports(&self) -> Vec<u16> {
        self.members().flat_map(|m| m.ports()).collect()
    }
}
