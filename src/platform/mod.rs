//! Host OS and CPU architecture detection.
//!
//! Only used to pick a registered redis executable for the current host.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Os {
    Unix,
    MacOsX,
    Windows,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86,
    X86_64,
    Aarch64,
    Other,
}

/// OS and architecture pair used as the executable registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Architecture,
}

impl Os {
    pub const ALL: [Os; 3] = [Os::Unix, Os::MacOsX, Os::Windows];

    pub fn detect() -> Self {
        Self::from_target(std::env::consts::OS)
    }

    pub(crate) fn from_target(os: &str) -> Self {
        match os {
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "solaris" | "illumos"
            | "aix" => Os::Unix,
            "macos" => Os::MacOsX,
            "windows" => Os::Windows,
            _ => Os::Other,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Os::Unix => "unix",
            Os::MacOsX => "macosx",
            Os::Windows => "windows",
            Os::Other => "other",
        }
    }
}

impl Architecture {
    pub const ALL: [Architecture; 3] =
        [Architecture::X86, Architecture::X86_64, Architecture::Aarch64];

    pub fn detect() -> Self {
        Self::from_target(std::env::consts::ARCH)
    }

    pub(crate) fn from_target(arch: &str) -> Self {
        match arch {
            "x86" => Architecture::X86,
            "x86_64" => Architecture::X86_64,
            "aarch64" => Architecture::Aarch64,
            _ => Architecture::Other,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
            Architecture::Aarch64 => "aarch64",
            Architecture::Other => "other",
        }
    }
}

impl Platform {
    pub fn new(
        os: Os,
        arch: Architecture,
    ) -> Self {
        Self { os, arch }
    }

    /// Platform of the running host.
    pub fn detect() -> Self {
        Self::new(Os::detect(), Architecture::detect())
    }
}

impl fmt::Display for Platform {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Parses tags such as `unix-x86_64` or `macosx-aarch64`.
impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = s
            .split_once('-')
            .ok_or_else(|| format!("platform tag must look like <os>-<arch>: {s}"))?;

        let os = Os::ALL
            .into_iter()
            .find(|o| o.as_str() == os)
            .ok_or_else(|| format!("unknown os in platform tag: {os}"))?;
        let arch = Architecture::ALL
            .into_iter()
            .find(|a| a.as_str() == arch)
            .ok_or_else(|| format!("unknown architecture in platform tag: {arch}"))?;

        Ok(Platform::new(os, arch))
    }
}
