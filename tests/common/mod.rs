use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use embedded_redis::ExecutableResolver;
use embedded_redis::Platform;
use embedded_redis::ProcessOptions;
use tempfile::TempDir;

pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
pub const STOP_GRACE_PERIOD: Duration = Duration::from_millis(500);

const SERVER_TRANSCRIPT: &str = include_str!("../fixtures/redis-4.x-standalone-startup-output.txt");
const SENTINEL_TRANSCRIPT: &str = include_str!("../fixtures/redis-3.x-sentinel-startup-output.txt");

/// Per-instance working area of a fake server, passed through the
/// environment so the scripts themselves can be shared.
const FAKE_DIR_ENV: &str = "FAKE_REDIS_DIR";

/// Scripts are written once per test binary: exec'ing a file while another
/// thread still holds it open for writing fails with ETXTBSY.
static SCRIPTS: once_cell::sync::Lazy<(TempDir, PathBuf, PathBuf)> =
    once_cell::sync::Lazy::new(|| {
        let dir = tempfile::tempdir().unwrap();
        let ready = write_script(dir.path(), "ready", "exec sleep 300");
        let crashing = write_script(dir.path(), "crashing", "exit 3");
        (dir, ready, crashing)
    });

/// A `redis-server` stand-in that prints a recorded transcript.
///
/// It appends every argument vector it was launched with to `launches.log`
/// and copies the config file it was given into `configs/`, so tests can
/// inspect what a real server would have received. Launches only land in
/// this instance's directory when started with [`FakeRedisServer::options`].
pub struct FakeRedisServer {
    dir: TempDir,
    path: PathBuf,
}

impl FakeRedisServer {
    pub fn ready() -> Self {
        Self::new(SCRIPTS.1.clone())
    }

    /// Prints the transcript but exits instead of serving.
    pub fn crashing() -> Self {
        Self::new(SCRIPTS.2.clone())
    }

    fn new(path: PathBuf) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("configs")).unwrap();
        Self { dir, path }
    }

    /// Short timeouts, and the environment the script records into.
    pub fn options(&self) -> ProcessOptions {
        ProcessOptions::default()
            .startup_timeout(STARTUP_TIMEOUT)
            .stop_grace_period(STOP_GRACE_PERIOD)
            .env(FAKE_DIR_ENV, self.dir.path().to_string_lossy())
    }

    pub fn resolver(&self) -> ExecutableResolver {
        let platform = Platform::detect();
        ExecutableResolver::default().with_override(platform.os, platform.arch, &self.path)
    }

    /// Argument lines of every launch so far.
    pub fn launches(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("launches.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Contents of every sentinel config file handed to the script.
    pub fn sentinel_configs(&self) -> Vec<String> {
        let mut configs: Vec<String> = fs::read_dir(self.dir.path().join("configs"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with("sentinel.conf"))
            .map(|entry| fs::read_to_string(entry.path()).unwrap())
            .collect();
        configs.sort();
        configs
    }
}

/// Whether `pid` exists and is not a zombie.
pub fn is_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists() && !is_zombie(pid)
}

fn is_zombie(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .map(|rest| rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(true)
}

fn write_script(
    dir: &Path,
    name: &str,
    tail: &str,
) -> PathBuf {
    let server = if tail.starts_with("exit") {
        SERVER_TRANSCRIPT
            .lines()
            .filter(|l| !l.contains("Ready to accept"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        SERVER_TRANSCRIPT.to_string()
    };

    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "${FAKE_DIR_ENV}/launches.log"
if [ -f "$1" ]; then
  cp "$1" "${FAKE_DIR_ENV}/configs/$(basename "$(dirname "$1")")-$(basename "$1")"
fi
if [ "$2" = "--sentinel" ]; then
cat <<'END'
{SENTINEL_TRANSCRIPT}
END
exec sleep 300
fi
cat <<'END'
{server}
END
{tail}
"#
    );

    let dir = dir.join(name);
    fs::create_dir(&dir).unwrap();
    let path = dir.join("redis-server");
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
