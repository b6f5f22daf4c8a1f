//! Typed redis server configuration and its rendering.

mod config;
mod render;
mod role;
pub use self::config::*;
pub use render::*;
pub use role::*;
