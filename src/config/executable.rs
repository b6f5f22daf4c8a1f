use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::platform::Platform;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExecutableConfig {
    /// Redis release used to name the default executables
    /// Default: "7.0.15"
    #[serde(default = "default_version")]
    pub version: String,

    /// Platform tag (e.g. `unix-x86_64`) to executable path
    #[serde(default)]
    pub overrides: HashMap<String, PathBuf>,

    /// Directory holding bundled executables, unpacked on demand
    #[serde(default)]
    pub bundle_dir: Option<PathBuf>,
}

impl Default for ExecutableConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            overrides: HashMap::new(),
            bundle_dir: None,
        }
    }
}

impl ExecutableConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(invalid("executable.version cannot be empty"));
        }
        for tag in self.overrides.keys() {
            tag.parse::<Platform>()
                .map_err(|e| invalid(format!("executable.overrides: {e}")))?;
        }
        Ok(())
    }

    /// Overrides keyed by parsed platform. Call after `validate()`.
    pub(crate) fn platform_overrides(&self) -> Vec<(Platform, PathBuf)> {
        self.overrides
            .iter()
            .filter_map(|(tag, path)| tag.parse::<Platform>().ok().map(|p| (p, path.clone())))
            .collect()
    }
}

fn default_version() -> String {
    "7.0.15".into()
}
