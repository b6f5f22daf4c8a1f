use std::path::PathBuf;
use std::time::Duration;

use crate::ProcessConfig;

/// Runtime knobs of a supervised process.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub startup_timeout: Duration,
    pub stop_grace_period: Duration,
    /// Parent of the per-start working directory; system temp dir if unset
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub output_capture_lines: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::from_config(&ProcessConfig::default())
    }
}

impl ProcessOptions {
    pub fn from_config(config: &ProcessConfig) -> Self {
        let mut env: Vec<(String, String)> =
            config.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.sort();

        Self {
            startup_timeout: config.startup_timeout(),
            stop_grace_period: config.stop_grace_period(),
            working_dir: config.working_dir.clone(),
            env,
            output_capture_lines: config.output_capture_lines,
        }
    }

    pub fn startup_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn stop_grace_period(
        mut self,
        grace: Duration,
    ) -> Self {
        self.stop_grace_period = grace;
        self
    }

    pub fn working_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}
