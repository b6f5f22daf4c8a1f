use std::collections::VecDeque;

use parking_lot::Mutex;

use super::PortProvider;
use crate::BuildError;
use crate::Result;

/// Consumes a fixed list of ports front to back.
#[derive(Debug)]
pub struct PredefinedPortProvider {
    ports: Mutex<VecDeque<u16>>,
}

impl PredefinedPortProvider {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: Mutex::new(ports.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.ports.lock().len()
    }
}

impl PortProvider for PredefinedPortProvider {
    fn next(&self) -> Result<u16> {
        self.ports.lock().pop_front().ok_or_else(|| BuildError::PortsExhausted.into())
    }
}
