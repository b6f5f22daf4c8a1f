use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Base ports for the sequential allocation scheme
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortsConfig {
    /// First port handed to masters and replicas
    /// Default: 6379
    #[serde(default = "default_server_base")]
    pub server_base: u16,

    /// First port handed to sentinels
    /// Default: 26379
    #[serde(default = "default_sentinel_base")]
    pub sentinel_base: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            server_base: default_server_base(),
            sentinel_base: default_sentinel_base(),
        }
    }
}

impl PortsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_base == 0 {
            return Err(invalid("ports.server_base must be non-zero"));
        }
        if self.sentinel_base == 0 {
            return Err(invalid("ports.sentinel_base must be non-zero"));
        }
        Ok(())
    }
}

fn default_server_base() -> u16 {
    6379
}
fn default_sentinel_base() -> u16 {
    26379
}
