//! Core type definitions with strong typing and validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Container identifier with validation
///
/// Used both as the virtual hostname and as the control group directory
/// name, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerId(String);

impl ContainerId {
    /// Maximum length for container IDs (also the hostname limit)
    pub const MAX_LENGTH: usize = 64;

    /// Identity used when none is given
    pub const DEFAULT: &'static str = "lilContainer";

    /// Create a new `ContainerId` with validation
    ///
    /// # Errors
    /// Returns error if ID is invalid (empty, too long, or contains invalid characters)
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Validate a container ID
    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Container ID cannot be empty".to_string(),
            });
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(Error::InvalidConfig {
                message: format!("Container ID too long (max {} chars)", Self::MAX_LENGTH),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidConfig {
                message: "Container ID can only contain alphanumeric, dash, and underscore"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get the container ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContainerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContainerId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}

/// Process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct ProcessId(i32);

impl ProcessId {
    /// Create from raw PID
    #[must_use]
    pub const fn from_raw(pid: i32) -> Self {
        Self(pid)
    }

    /// Get the current process ID
    #[must_use]
    pub fn current() -> Self {
        Self(nix::unistd::getpid().as_raw())
    }

    /// Get the parent process ID
    ///
    /// Inside a fresh PID namespace the parent lives outside of it and
    /// this returns 0.
    #[must_use]
    pub fn parent() -> Self {
        Self(nix::unistd::getppid().as_raw())
    }

    /// Convert to `nix::unistd::Pid`
    #[must_use]
    pub const fn as_nix_pid(self) -> nix::unistd::Pid {
        nix::unistd::Pid::from_raw(self.0)
    }

    /// Get raw PID value
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<nix::unistd::Pid> for ProcessId {
    fn from(pid: nix::unistd::Pid) -> Self {
        Self(pid.as_raw())
    }
}

impl From<ProcessId> for nix::unistd::Pid {
    fn from(pid: ProcessId) -> Self {
        Self::from_raw(pid.0)
    }
}

/// Ceiling on the number of processes in a control group (`pids.max`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PidsLimit(u32);

impl PidsLimit {
    /// Ceiling used when none is given
    pub const DEFAULT: Self = Self(100);

    /// Create a new limit
    ///
    /// # Errors
    /// Returns error if the limit is zero
    pub fn new(max: u32) -> Result<Self> {
        if max == 0 {
            return Err(Error::InvalidConfig {
                message: "pids limit must be at least 1".to_string(),
            });
        }
        Ok(Self(max))
    }

    /// Get the raw ceiling
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for PidsLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PidsLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PidsLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let max = s.trim().parse::<u32>().map_err(|e| Error::InvalidConfig {
            message: format!("invalid pids limit '{s}': {e}"),
        })?;
        Self::new(max)
    }
}

impl TryFrom<u32> for PidsLimit {
    type Error = Error;

    fn try_from(max: u32) -> Result<Self> {
        Self::new(max)
    }
}

impl From<PidsLimit> for u32 {
    fn from(limit: PidsLimit) -> Self {
        limit.0
    }
}

/// Which process gets written into `cgroup.procs`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTarget {
    /// The parent of the configuring process
    ///
    /// When the bootstrapper runs as init of a new PID namespace this
    /// resolves to 0, which cgroup v2 treats as "the writing process".
    #[default]
    Parent,
    /// The configuring process itself
    Current,
}

impl MembershipTarget {
    /// Resolve to a concrete process ID for the calling process
    #[must_use]
    pub fn resolve(self) -> ProcessId {
        match self {
            Self::Parent => ProcessId::parent(),
            Self::Current => ProcessId::current(),
        }
    }

    /// Name as used on the command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for MembershipTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parent" => Ok(Self::Parent),
            "current" => Ok(Self::Current),
            other => Err(Error::InvalidConfig {
                message: format!("unknown membership target '{other}' (expected parent or current)"),
            }),
        }
    }
}
