use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

/// Directives shared by every sentinel of a topology.
///
/// Each value is rendered once per monitored replication group.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SentinelConfig {
    /// `sentinel down-after-milliseconds`
    /// Default: 60000
    #[serde(default = "default_down_after_ms")]
    pub down_after_ms: u64,

    /// `sentinel failover-timeout`
    /// Default: 180000
    #[serde(default = "default_failover_timeout_ms")]
    pub failover_timeout_ms: u64,

    /// `sentinel parallel-syncs`
    /// Default: 1
    #[serde(default = "default_parallel_syncs")]
    pub parallel_syncs: u32,

    /// Quorum used when neither the topology nor the group overrides it
    /// Default: 1
    #[serde(default = "default_quorum")]
    pub quorum: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            down_after_ms: default_down_after_ms(),
            failover_timeout_ms: default_failover_timeout_ms(),
            parallel_syncs: default_parallel_syncs(),
            quorum: default_quorum(),
        }
    }
}

impl SentinelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.down_after_ms == 0 {
            return Err(invalid("sentinel.down_after_ms must be greater than 0"));
        }
        if self.failover_timeout_ms == 0 {
            return Err(invalid("sentinel.failover_timeout_ms must be greater than 0"));
        }
        if self.parallel_syncs == 0 {
            return Err(invalid("sentinel.parallel_syncs must be at least 1"));
        }
        if self.quorum == 0 {
            return Err(invalid("sentinel.quorum must be at least 1"));
        }
        Ok(())
    }
}

fn default_down_after_ms() -> u64 {
    60_000
}
fn default_failover_timeout_ms() -> u64 {
    180_000
}
fn default_parallel_syncs() -> u32 {
    1
}
fn default_quorum() -> usize {
    1
}
