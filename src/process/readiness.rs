use regex::Regex;

use crate::server::ServerRole;
use crate::Result;

/// Matches the startup banner of every known redis-server release, from the
/// 2.x `The server is now ready to accept connections on port 6379` to the
/// 7.x `Ready to accept connections tcp`.
pub const REDIS_READY_PATTERN: &str = r"(?i)ready to accept connections";

/// Sentinels announce themselves with `Sentinel runid is` (up to 3.x) or
/// `Sentinel ID is` (4.x onwards).
pub const SENTINEL_READY_PATTERN: &str = r"Sentinel (runid|ID) is";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
}

/// Scans output lines for the readiness pattern.
///
/// Unrelated lines are ignored; once a line matches, the detector stays
/// ready until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct ReadinessDetector {
    pattern: Regex,
    matched: bool,
}

impl ReadinessDetector {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self::from_regex(Regex::new(pattern)?))
    }

    pub fn from_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            matched: false,
        }
    }

    pub fn for_role(role: ServerRole) -> Self {
        let pattern = match role {
            ServerRole::Sentinel => SENTINEL_READY_PATTERN,
            _ => REDIS_READY_PATTERN,
        };
        Self::from_regex(Regex::new(pattern).expect("built-in readiness pattern is valid"))
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn observe(
        &mut self,
        line: &str,
    ) -> Readiness {
        if !self.matched && self.pattern.is_match(line) {
            self.matched = true;
        }
        self.readiness()
    }

    /// Feeds lines until one matches or the input runs out.
    pub fn scan<I, S>(
        &mut self,
        lines: I,
    ) -> Readiness
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            if self.observe(line.as_ref()) == Readiness::Ready {
                break;
            }
        }
        self.readiness()
    }

    pub fn readiness(&self) -> Readiness {
        if self.matched {
            Readiness::Ready
        } else {
            Readiness::Pending
        }
    }

    pub fn reset(&mut self) {
        self.matched = false;
    }

    /// Same pattern, no carried state.
    pub fn fresh(&self) -> Self {
        Self::from_regex(self.pattern.clone())
    }
}
