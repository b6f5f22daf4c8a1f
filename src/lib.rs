//! Ephemeral redis servers and sentinel topologies for test suites.
//!
//! ## Example
//! ```ignore
//! let cluster = ClusterBuilder::new()
//!     .ephemeral()
//!     .sentinel_count(3)
//!     .quorum(2)
//!     .replication_group("master1", 2)
//!     .build()?;
//! cluster.start().await?;
//! let ports = cluster.server_ports();
//! // ...
//! cluster.stop().await?;
//! ```

mod cluster;
mod config;
mod errors;
mod executable;
mod platform;
mod ports;
mod process;
mod server;

pub use cluster::*;
pub use errors::*;
pub use executable::*;
pub use platform::*;
pub use ports::*;
pub use process::*;
pub use server::*;
pub use self::config::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
