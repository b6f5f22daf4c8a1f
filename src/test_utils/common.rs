use std::fs;
use std::time::Duration;

use crate::ProcessOptions;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Short timeouts so failure paths finish quickly.
pub fn fast_options() -> ProcessOptions {
    ProcessOptions::default()
        .startup_timeout(Duration::from_secs(5))
        .stop_grace_period(Duration::from_millis(500))
}

/// Polls `condition` every 20ms until it holds or `timeout` elapses.
pub async fn eventually(
    timeout: Duration,
    mut condition: impl FnMut() -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Whether `pid` exists and has not become a zombie.
pub fn is_running(pid: u32) -> bool {
    fs::read_to_string(format!("/proc/{pid}/stat"))
        .map(|stat| {
            stat.rsplit(')')
                .next()
                .map(|rest| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}
