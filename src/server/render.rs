//! Turns a [`ServerConfig`] into the form `redis-server` expects.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use super::LaunchMode;
use super::ServerConfig;
use super::ServerRole;
use crate::BuildError;
use crate::Result;

pub const SERVER_CONFIG_FILE: &str = "redis.conf";
pub const SENTINEL_CONFIG_FILE: &str = "sentinel.conf";

/// Program and arguments for one process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Rendered file, when the config was not passed inline
    pub config_file: Option<PathBuf>,
}

pub struct ConfigRenderer;

impl ConfigRenderer {
    /// Renders configuration lines in `redis.conf` syntax.
    ///
    /// Order: listener settings, replication upstream, sentinel monitor
    /// blocks (one per group), then the free-form lines as given.
    pub fn render(config: &ServerConfig) -> Vec<String> {
        let mut lines = vec![
            format!("port {}", config.port()),
            format!("bind {}", config.bind()),
        ];

        if let Some(tls_port) = config.tls_port() {
            lines.push(format!("tls-port {tls_port}"));
        }

        if let Some(master) = config.replica_of() {
            lines.push(format!(
                "{} {} {}",
                config.replication_directive().as_str(),
                master.host,
                master.port
            ));
        }

        let sentinel = config.sentinel();
        for m in config.monitors() {
            lines.push(format!(
                "sentinel monitor {} {} {} {}",
                m.group, m.host, m.port, m.quorum
            ));
            lines.push(format!(
                "sentinel down-after-milliseconds {} {}",
                m.group, sentinel.down_after_ms
            ));
            lines.push(format!(
                "sentinel failover-timeout {} {}",
                m.group, sentinel.failover_timeout_ms
            ));
            lines.push(format!(
                "sentinel parallel-syncs {} {}",
                m.group, sentinel.parallel_syncs
            ));
        }

        lines.extend(config.settings().iter().map(|l| l.trim().to_string()));
        lines
    }

    /// `key v1 v2` lines become `--key v1 v2` tokens.
    pub fn inline_args(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .flat_map(|line| {
                let mut tokens = line.split_whitespace();
                let key = tokens.next().map(|k| format!("--{k}"));
                key.into_iter().chain(tokens.map(str::to_string)).collect::<Vec<_>>()
            })
            .collect()
    }

    /// Builds the launch command, writing the config file into `workdir`
    /// when the config is not passed inline.
    pub fn launch_command(
        config: &ServerConfig,
        executable: &Path,
        workdir: &Path,
    ) -> Result<LaunchCommand> {
        let lines = Self::render(config);

        if config.launch_mode() == LaunchMode::Inline {
            return Ok(LaunchCommand {
                program: executable.to_path_buf(),
                args: Self::inline_args(&lines),
                config_file: None,
            });
        }

        let file_name = match config.role() {
            ServerRole::Sentinel => SENTINEL_CONFIG_FILE,
            _ => SERVER_CONFIG_FILE,
        };
        let path = workdir.join(file_name);
        let mut contents = lines.join("\n");
        contents.push('\n');
        fs::write(&path, contents)
            .map_err(|e| BuildError::io(format!("failed to write {}", path.display()), e))?;
        debug!("rendered {} for {}", path.display(), config.label());

        let mut args = vec![path.to_string_lossy().into_owned()];
        if config.role().is_sentinel() {
            args.push("--sentinel".into());
        }

        Ok(LaunchCommand {
            program: executable.to_path_buf(),
            args,
            config_file: Some(path),
        })
    }
}
