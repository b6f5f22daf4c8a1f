use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::net::TcpListener;

use parking_lot::Mutex;
use tracing::debug;

use super::PortProvider;
use crate::BuildError;
use crate::Result;

const MAX_ATTEMPTS: usize = 32;

/// Asks the OS for a currently unused port.
///
/// The port is released again before it is returned, so another process may
/// still grab it before the redis server binds; ports already handed out by
/// this provider are never repeated.
#[derive(Debug, Default)]
pub struct EphemeralPortProvider {
    issued: Mutex<HashSet<u16>>,
}

impl EphemeralPortProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PortProvider for EphemeralPortProvider {
    fn next(&self) -> Result<u16> {
        for _ in 0..MAX_ATTEMPTS {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
                .map_err(|e| BuildError::io("failed to bind an ephemeral port", e))?;
            let port = listener
                .local_addr()
                .map_err(|e| BuildError::io("failed to read ephemeral port", e))?
                .port();
            drop(listener);

            if self.issued.lock().insert(port) {
                debug!("allocated ephemeral port {}", port);
                return Ok(port);
            }
        }
        Err(BuildError::PortsExhausted.into())
    }
}
