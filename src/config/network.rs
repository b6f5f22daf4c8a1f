use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Address every spawned process binds to, and the address sentinels and
    /// replicas use to reach masters
    /// Default: "127.0.0.1"
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bind.trim().is_empty() {
            return Err(invalid("network.bind cannot be empty"));
        }
        if self.bind.contains(char::is_whitespace) {
            return Err(invalid(format!(
                "network.bind must be a single address, got '{}'",
                self.bind
            )));
        }
        Ok(())
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}
