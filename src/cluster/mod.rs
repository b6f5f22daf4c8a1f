//! Replicated redis topologies: planning, building and aggregate control.

mod builder;
mod controller;
pub use builder::*;
pub use controller::*;
