//! Port allocation for spawned processes.
//!
//! A [`PortProvider`] never hands out the same port twice and may be shared
//! between threads while a large topology is being assembled.

mod ephemeral;
mod predefined;
mod sequence;
pub use ephemeral::*;
pub use predefined::*;
pub use sequence::*;


use crate::Result;

pub trait PortProvider: Send + Sync {
    /// Returns the next unused port of this provider.
    ///
    /// # Errors
    /// `BuildError::PortsExhausted` once the provider has nothing left.
    fn next(&self) -> Result<u16>;
}
