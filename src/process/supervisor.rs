//! Supervision of a single redis process.
//!
//! ## Lifecycle
//! `Idle -> Running -> Idle`, repeatable. `start()` spawns the process, hands
//! its merged stdout/stderr to a drain task and waits (bounded by the startup
//! timeout) for the drain task to report that the readiness pattern appeared
//! or that the output closed. The drain task keeps consuming output for the
//! whole life of the process so the child never blocks on a full pipe.
//!
//! `stop()` sends SIGTERM, waits for the grace period, then kills.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStderr;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::OutputLog;
use super::ProcessOptions;
use super::Readiness;
use super::ReadinessDetector;
use crate::executable::ResolvedExecutable;
use crate::server::ConfigRenderer;
use crate::server::ServerConfig;
use crate::Error;
use crate::Result;
use crate::StartupError;
use crate::TeardownError;

/// Upper bound for the drain task to notice EOF after the process is gone.
const DRAIN_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Start/stop/health capability shared by every member of a cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManagedProcess: Send + Sync {
    fn name(&self) -> String;

    /// Ports the process listens on once running.
    fn ports(&self) -> Vec<u16>;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Non-blocking; false once the process exited on its own.
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Running,
}

#[derive(Debug)]
enum StartupSignal {
    Ready,
    OutputClosed,
}

struct ProcessHandle {
    state: ProcessState,
    child: Option<Child>,
    drain: Option<JoinHandle<()>>,
    workdir: Option<TempDir>,
}

/// Owns exactly one OS process running `redis-server`.
pub struct ServerProcess {
    name: String,
    config: ServerConfig,
    executable: ResolvedExecutable,
    detector: ReadinessDetector,
    options: ProcessOptions,
    output: OutputLog,
    handle: Mutex<ProcessHandle>,
    // serializes start() and stop()
    lifecycle: tokio::sync::Mutex<()>,
}

impl ServerProcess {
    pub fn new(
        config: ServerConfig,
        executable: ResolvedExecutable,
        options: ProcessOptions,
    ) -> Self {
        Self {
            name: config.label(),
            detector: ReadinessDetector::for_role(config.role()),
            output: OutputLog::new(options.output_capture_lines),
            config,
            executable,
            options,
            handle: Mutex::new(ProcessHandle {
                state: ProcessState::Idle,
                child: None,
                drain: None,
                workdir: None,
            }),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the role's default readiness pattern.
    pub fn with_detector(
        mut self,
        detector: ReadinessDetector,
    ) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn executable(&self) -> &ResolvedExecutable {
        &self.executable
    }

    pub fn state(&self) -> ProcessState {
        self.handle.lock().state
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.lock().child.as_ref().and_then(Child::id)
    }

    /// Most recent output lines of the current or last run.
    pub fn output(&self) -> Vec<String> {
        self.output.lines()
    }

    fn create_workdir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("embedded-redis-");
        let dir = match &self.options.working_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| self.spawn_failed(e))
    }

    fn spawn_failed(
        &self,
        source: std::io::Error,
    ) -> Error {
        StartupError::SpawnFailed {
            name: self.name.clone(),
            source,
        }
        .into()
    }

    fn spawn(
        &self,
        workdir: &TempDir,
    ) -> Result<(Child, ChildStdout, ChildStderr)> {
        let launch =
            ConfigRenderer::launch_command(&self.config, self.executable.path(), workdir.path())?;
        debug!("launching {}: {:?} {:?}", self.name, launch.program, launch.args);

        let mut child = Command::new(&launch.program)
            .args(&launch.args)
            .current_dir(workdir.path())
            .envs(self.options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_failed(e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => Ok((child, stdout, stderr)),
            _ => Err(self.spawn_failed(std::io::Error::other("output pipes were not captured"))),
        }
    }

    /// SIGTERM, grace period, then SIGKILL. Reaps the child in every case.
    async fn terminate(
        &self,
        child: &mut Child,
    ) -> Result<()> {
        let stop_failed = |source: std::io::Error| -> Error {
            TeardownError::Stop {
                name: self.name.clone(),
                source,
            }
            .into()
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!("{} had already exited: {}", self.name, status);
            return Ok(());
        }

        request_shutdown(child).map_err(stop_failed)?;

        match timeout(self.options.stop_grace_period, child.wait()).await {
            Ok(Ok(status)) => {
                debug!("{} exited: {}", self.name, status);
                Ok(())
            }
            Ok(Err(e)) => Err(stop_failed(e)),
            Err(_) => {
                warn!(
                    "{} did not exit within {:?}, killing it",
                    self.name, self.options.stop_grace_period
                );
                child.kill().await.map_err(stop_failed)
            }
        }
    }

    /// Cleans up after a failed start; the process must not outlive the error.
    async fn abandon(
        &self,
        mut child: Child,
        drain: JoinHandle<()>,
    ) {
        if let Err(e) = self.terminate(&mut child).await {
            error!("failed to clean up {} after failed start: {}", self.name, e);
        }
        finish_drain(drain).await;
    }
}

#[async_trait]
impl ManagedProcess for ServerProcess {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn ports(&self) -> Vec<u16> {
        self.config.ports()
    }

    async fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.state() == ProcessState::Running {
            return Err(Error::Fatal(format!(
                "{} is already running; stop it before starting again",
                self.name
            )));
        }

        let workdir = self.create_workdir()?;
        let (mut child, stdout, stderr) = self.spawn(&workdir)?;
        info!("{} spawned (pid {:?})", self.name, child.id());

        self.output.clear();
        let (ready_tx, ready_rx) = oneshot::channel();
        let drain = tokio::spawn(drain_output(
            self.name.clone(),
            stdout,
            stderr,
            self.detector.fresh(),
            self.output.clone(),
            ready_tx,
        ));

        match timeout(self.options.startup_timeout, ready_rx).await {
            Ok(Ok(StartupSignal::Ready)) => {
                let mut handle = self.handle.lock();
                handle.state = ProcessState::Running;
                handle.child = Some(child);
                handle.drain = Some(drain);
                handle.workdir = Some(workdir);
                info!("{} is ready", self.name);
                Ok(())
            }
            Ok(Ok(StartupSignal::OutputClosed)) | Ok(Err(_)) => {
                let status = timeout(self.options.stop_grace_period, child.wait())
                    .await
                    .ok()
                    .and_then(|r| r.ok());
                self.abandon(child, drain).await;
                error!("{} exited before it was ready: {:?}", self.name, status);
                Err(StartupError::Failed {
                    name: self.name.clone(),
                    status,
                    output: self.output.snapshot(),
                }
                .into())
            }
            Err(_) => {
                self.abandon(child, drain).await;
                error!(
                    "{} was not ready after {:?}",
                    self.name, self.options.startup_timeout
                );
                Err(StartupError::Timeout {
                    name: self.name.clone(),
                    timeout: self.options.startup_timeout,
                    output: self.output.snapshot(),
                }
                .into())
            }
        }
    }

    async fn stop(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let (child, drain, workdir) = {
            let mut handle = self.handle.lock();
            if handle.state == ProcessState::Idle {
                return Ok(());
            }
            (handle.child.take(), handle.drain.take(), handle.workdir.take())
        };

        let result = match child {
            Some(mut child) => self.terminate(&mut child).await,
            None => Ok(()),
        };
        if let Some(drain) = drain {
            finish_drain(drain).await;
        }
        drop(workdir);

        self.handle.lock().state = ProcessState::Idle;
        info!("{} stopped", self.name);
        result
    }

    fn is_active(&self) -> bool {
        let mut handle = self.handle.lock();
        if handle.state != ProcessState::Running {
            return false;
        }
        match handle.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Drains merged stdout/stderr line by line until both pipes close.
///
/// Sends `Ready` the first time the detector matches, or `OutputClosed` if
/// the pipes close first.
async fn drain_output(
    name: String,
    stdout: ChildStdout,
    stderr: ChildStderr,
    mut detector: ReadinessDetector,
    output: OutputLog,
    ready_tx: oneshot::Sender<StartupSignal>,
) {
    let stdout = LinesStream::new(BufReader::new(stdout).lines());
    let stderr = LinesStream::new(BufReader::new(stderr).lines());
    let mut lines = stdout.merge(stderr);
    let mut ready_tx = Some(ready_tx);

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("[{}] stopped reading output: {}", name, e);
                break;
            }
        };
        debug!("[{}] {}", name, line);

        if ready_tx.is_some() && detector.observe(&line) == Readiness::Ready {
            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(StartupSignal::Ready);
            }
        }
        output.push(line);
    }

    if let Some(tx) = ready_tx.take() {
        let _ = tx.send(StartupSignal::OutputClosed);
    }
}

async fn finish_drain(mut drain: JoinHandle<()>) {
    if timeout(DRAIN_SHUTDOWN_TIMEOUT, &mut drain).await.is_err() {
        // a forked grandchild may still hold the pipes
        drain.abort();
    }
}

#[cfg(unix)]
fn request_shutdown(child: &mut Child) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn request_shutdown(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
