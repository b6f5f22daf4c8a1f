use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::invalid;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessConfig {
    /// How long `start()` waits for the readiness line
    /// Default: 10000
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Time between SIGTERM and the forced kill on stop
    /// Default: 3000
    #[serde(default = "default_stop_grace_period_ms")]
    pub stop_grace_period_ms: u64,

    /// Parent directory for per-process working directories.
    /// Default: system temp directory
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for every spawned process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Number of trailing output lines kept for error reports
    /// Default: 200
    #[serde(default = "default_output_capture_lines")]
    pub output_capture_lines: usize,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            startup_timeout_ms: default_startup_timeout_ms(),
            stop_grace_period_ms: default_stop_grace_period_ms(),
            working_dir: None,
            env: HashMap::new(),
            output_capture_lines: default_output_capture_lines(),
        }
    }
}

impl ProcessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.startup_timeout_ms == 0 {
            return Err(invalid("process.startup_timeout_ms must be greater than 0"));
        }
        if self.stop_grace_period_ms == 0 {
            return Err(invalid("process.stop_grace_period_ms must be greater than 0"));
        }
        if self.output_capture_lines == 0 {
            return Err(invalid("process.output_capture_lines must be greater than 0"));
        }
        if let Some(dir) = &self.working_dir {
            if !dir.is_dir() {
                return Err(invalid(format!(
                    "process.working_dir {} is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_millis(self.stop_grace_period_ms)
    }
}

fn default_startup_timeout_ms() -> u64 {
    10_000
}
fn default_stop_grace_period_ms() -> u64 {
    3_000
}
fn default_output_capture_lines() -> usize {
    200
}
