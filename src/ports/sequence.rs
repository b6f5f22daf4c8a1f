use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use super::PortProvider;
use crate::BuildError;
use crate::Result;

/// Hands out `base, base + 1, base + 2, ...`
#[derive(Debug)]
pub struct SequencePortProvider {
    current: AtomicU32,
}

impl SequencePortProvider {
    pub fn new(base: u16) -> Self {
        Self {
            current: AtomicU32::new(base as u32),
        }
    }
}

impl PortProvider for SequencePortProvider {
    fn next(&self) -> Result<u16> {
        let port = self.current.fetch_add(1, Ordering::SeqCst);
        // past u16::MAX the sequence has nothing valid left to give
        u16::try_from(port).map_err(|_| BuildError::PortsExhausted.into())
    }
}
