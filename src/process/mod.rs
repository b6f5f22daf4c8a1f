//! Supervision of individual redis processes.
//!
//! A [`ServerProcess`] owns exactly one OS process and implements the
//! [`ManagedProcess`] capability the cluster controller drives. Readiness is
//! decided by a [`ReadinessDetector`] fed from the process's output.

mod builder;
mod options;
mod output;
mod readiness;
mod supervisor;
pub use builder::*;
pub use options::*;
pub use output::*;
pub use readiness::*;
pub use supervisor::*;
