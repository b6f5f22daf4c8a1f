//! Resolves the redis executable for the current platform.
//!
//! [`ExecutableResolver`] is an immutable registry from [`Platform`] to an
//! executable name or path. Overrides return a new resolver, so concurrently
//! running tests never observe each other's registry.


use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tracing::debug;

use crate::platform::Architecture;
use crate::platform::Os;
use crate::platform::Platform;
use crate::BuildError;
use crate::Result;
use crate::Settings;

pub const DEFAULT_REDIS_VERSION: &str = "7.0.15";

#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    executables: HashMap<Platform, PathBuf>,
    bundle_dir: Option<PathBuf>,
}

/// A runnable executable path.
///
/// When the binary had to be unpacked from the bundle directory, the
/// temporary copy lives as long as any clone of this value.
#[derive(Debug, Clone)]
pub struct ResolvedExecutable {
    path: PathBuf,
    _unpacked: Option<Arc<TempDir>>,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::for_version(DEFAULT_REDIS_VERSION)
    }
}

impl ExecutableResolver {
    /// Registry of the stock release names for `version`.
    pub fn for_version(version: &str) -> Self {
        let name = |suffix: &str| PathBuf::from(format!("redis-server-{version}-{suffix}"));

        let executables = HashMap::from([
            (Platform::new(Os::Unix, Architecture::X86), name("linux-386")),
            (Platform::new(Os::Unix, Architecture::X86_64), name("linux-amd64")),
            (Platform::new(Os::Unix, Architecture::Aarch64), name("linux-arm64")),
            (Platform::new(Os::MacOsX, Architecture::X86_64), name("darwin-amd64")),
            (Platform::new(Os::MacOsX, Architecture::Aarch64), name("darwin-arm64")),
        ]);

        Self {
            executables,
            bundle_dir: None,
        }
    }

    /// Registry described by the `executable` settings section.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut resolver = Self::for_version(&settings.executable.version);
        for (platform, path) in settings.executable.platform_overrides() {
            resolver = resolver.with_override(platform.os, platform.arch, path);
        }
        match &settings.executable.bundle_dir {
            Some(dir) => resolver.with_bundle_dir(dir),
            None => resolver,
        }
    }

    /// Uses `executable` for one os/architecture pair.
    pub fn with_override(
        mut self,
        os: Os,
        arch: Architecture,
        executable: impl Into<PathBuf>,
    ) -> Self {
        self.executables.insert(Platform::new(os, arch), executable.into());
        self
    }

    /// Uses `executable` for every architecture of `os`.
    pub fn with_os_override(
        self,
        os: Os,
        executable: impl Into<PathBuf>,
    ) -> Self {
        let executable = executable.into();
        Architecture::ALL
            .into_iter()
            .fold(self, |resolver, arch| resolver.with_override(os, arch, executable.clone()))
    }

    /// Directory searched for registered names that are not paths on disk.
    pub fn with_bundle_dir(
        mut self,
        dir: impl Into<PathBuf>,
    ) -> Self {
        self.bundle_dir = Some(dir.into());
        self
    }

    pub fn registered(
        &self,
        platform: Platform,
    ) -> Option<&Path> {
        self.executables.get(&platform).map(PathBuf::as_path)
    }

    pub fn resolve(&self) -> Result<ResolvedExecutable> {
        self.resolve_for(Platform::detect())
    }

    /// # Errors
    /// `BuildError::ExecutableNotFound` when nothing is registered for
    /// `platform` or the registered name exists neither on disk nor in the
    /// bundle directory.
    pub fn resolve_for(
        &self,
        platform: Platform,
    ) -> Result<ResolvedExecutable> {
        let executable = self
            .executables
            .get(&platform)
            .ok_or(BuildError::ExecutableNotFound { platform })?;

        if executable.is_file() {
            return Ok(ResolvedExecutable::at(executable.clone()));
        }

        let bundled = self
            .bundle_dir
            .as_ref()
            .map(|dir| dir.join(executable))
            .filter(|candidate| candidate.is_file())
            .ok_or(BuildError::ExecutableNotFound { platform })?;

        unpack(&bundled)
    }
}

impl ResolvedExecutable {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _unpacked: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Copies a bundled executable into a fresh temporary directory and marks it
/// executable.
fn unpack(bundled: &Path) -> Result<ResolvedExecutable> {
    let dir = tempfile::Builder::new()
        .prefix("embedded-redis-")
        .tempdir()
        .map_err(|e| BuildError::io("failed to create directory for bundled executable", e))?;

    let file_name = bundled.file_name().unwrap_or(bundled.as_os_str());
    let target = dir.path().join(file_name);
    fs::copy(bundled, &target).map_err(|e| {
        BuildError::io(format!("failed to unpack {}", bundled.display()), e)
    })?;
    mark_executable(&target)?;

    debug!("unpacked {} to {}", bundled.display(), target.display());
    Ok(ResolvedExecutable {
        path: target,
        _unpacked: Some(Arc::new(dir)),
    })
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        BuildError::io(format!("failed to mark {} executable", path.display()), e).into()
    })
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
