//! Shell-script stand-ins for `redis-server`.
//!
//! The scripts print a recorded startup transcript and then behave like the
//! real server as far as the supervisor can tell.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use tempfile::TempDir;

use crate::platform::Platform;
use crate::ExecutableResolver;
use crate::ResolvedExecutable;

const SERVER_TRANSCRIPT: &str =
    include_str!("../../tests/fixtures/redis-6.x-standalone-startup-output.txt");
const SENTINEL_TRANSCRIPT: &str =
    include_str!("../../tests/fixtures/redis-6.x-sentinel-startup-output.txt");

/// When set, every script writes its pid into the named file first.
pub const PID_FILE_ENV: &str = "FAKE_REDIS_PID_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Prints the full transcript and keeps running
    Ready,
    /// Prints part of the transcript and exits with status 1
    ExitBeforeReady,
    /// Prints part of the transcript and keeps running
    NeverReady,
    /// Ready, but ignores SIGTERM
    IgnoreTerm,
}

/// Scripts are written once per test binary: exec'ing a file while another
/// thread still holds it open for writing fails with ETXTBSY.
static SCRIPTS: once_cell::sync::Lazy<(TempDir, Vec<(FakeBehavior, PathBuf)>)> =
    once_cell::sync::Lazy::new(|| {
        let dir = tempfile::tempdir().unwrap();
        let scripts = [
            FakeBehavior::Ready,
            FakeBehavior::ExitBeforeReady,
            FakeBehavior::NeverReady,
            FakeBehavior::IgnoreTerm,
        ]
        .into_iter()
        .map(|behavior| {
            let path = dir.path().join(format!("{behavior:?}")).join("redis-server");
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            write_script(&path, &script(behavior));
            (behavior, path)
        })
        .collect();
        (dir, scripts)
    });

pub struct FakeRedis {
    path: PathBuf,
}

impl FakeRedis {
    pub fn new(behavior: FakeBehavior) -> Self {
        let (_, scripts) = &*SCRIPTS;
        let path = scripts
            .iter()
            .find(|(b, _)| *b == behavior)
            .map(|(_, p)| p.clone())
            .unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn executable(&self) -> ResolvedExecutable {
        ResolvedExecutable::at(&self.path)
    }

    /// Resolver that maps the current platform to this script.
    pub fn resolver(&self) -> ExecutableResolver {
        let platform = Platform::detect();
        ExecutableResolver::default().with_override(platform.os, platform.arch, &self.path)
    }
}

fn script(behavior: FakeBehavior) -> String {
    let until_ready = |transcript: &str| -> String {
        transcript
            .lines()
            .take_while(|l| !l.contains("Ready to accept") && !l.contains("Sentinel ID is"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let (server, sentinel, tail) = match behavior {
        FakeBehavior::Ready => (
            SERVER_TRANSCRIPT.to_string(),
            SENTINEL_TRANSCRIPT.to_string(),
            "exec sleep 300",
        ),
        FakeBehavior::IgnoreTerm => (
            SERVER_TRANSCRIPT.to_string(),
            SENTINEL_TRANSCRIPT.to_string(),
            "trap '' TERM\nexec sleep 300",
        ),
        FakeBehavior::NeverReady => (
            until_ready(SERVER_TRANSCRIPT),
            until_ready(SENTINEL_TRANSCRIPT),
            "exec sleep 300",
        ),
        FakeBehavior::ExitBeforeReady => (
            format!(
                "{}\n# Can't open the append-only file: Permission denied",
                until_ready(SERVER_TRANSCRIPT)
            ),
            until_ready(SENTINEL_TRANSCRIPT),
            "exit 1",
        ),
    };

    format!(
        "#!/bin/sh\nif [ -n \"${PID_FILE_ENV}\" ]; then echo $$ > \"${PID_FILE_ENV}\"; fi\nif [ \"$2\" = \"--sentinel\" ]; then\ncat <<'EOF'\n{sentinel}\nEOF\nelse\ncat <<'EOF'\n{server}\nEOF\nfi\n{tail}\n"
    )
}

fn write_script(
    path: &Path,
    content: &str,
) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
