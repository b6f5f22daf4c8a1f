use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Declarative cluster description loaded from settings.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TopologyConfig {
    /// Number of sentinels allocated from the sentinel port scheme
    #[serde(default)]
    pub sentinel_count: Option<usize>,

    /// Explicit sentinel ports; exclusive with `sentinel_count`
    #[serde(default)]
    pub sentinel_ports: Vec<u16>,

    /// Global quorum; falls back to `sentinel.quorum`
    #[serde(default)]
    pub quorum: Option<usize>,

    /// Ask the OS for unused ports instead of the sequential scheme
    #[serde(default)]
    pub ephemeral: bool,

    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub name: String,

    #[serde(default)]
    pub replicas: usize,

    #[serde(default)]
    pub quorum: Option<usize>,
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sentinel_count.is_some() && !self.sentinel_ports.is_empty() {
            return Err(invalid(
                "topology.sentinel_count and topology.sentinel_ports are mutually exclusive",
            ));
        }
        if self.quorum == Some(0) {
            return Err(invalid("topology.quorum must be at least 1"));
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(invalid("topology.groups: name cannot be empty"));
            }
            if !names.insert(group.name.as_str()) {
                return Err(invalid(format!(
                    "topology.groups: duplicate group name {}",
                    group.name
                )));
            }
            if group.quorum == Some(0) {
                return Err(invalid(format!(
                    "topology.groups: quorum of {} must be at least 1",
                    group.name
                )));
            }
        }
        Ok(())
    }
}
