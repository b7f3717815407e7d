//! User namespace identity mapping
//!
//! Maps root inside the new user namespace onto the invoking user on the
//! host, so the container runs as virtual root without real privileges.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lil_core::{Error, ProcessId, Result};
use serde::{Deserialize, Serialize};

/// One line of `/proc/<pid>/uid_map` or `gid_map`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    /// First ID inside the namespace
    pub inside: u32,
    /// First ID on the host
    pub outside: u32,
    /// Number of consecutive IDs mapped
    pub count: u32,
}

impl IdMapping {
    /// Map virtual root to a single host ID
    #[must_use]
    pub const fn root_to(host_id: u32) -> Self {
        Self {
            inside: 0,
            outside: host_id,
            count: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.inside, self.outside, self.count)
    }
}

/// UID and GID mapping applied to a freshly cloned process
///
/// Exactly one entry per identity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNamespaceMapping {
    /// Entry for `uid_map`
    pub uid: IdMapping,
    /// Entry for `gid_map`
    pub gid: IdMapping,
}

impl UserNamespaceMapping {
    /// Map root to the calling process's real UID and GID
    #[must_use]
    pub fn current_user() -> Self {
        Self {
            uid: IdMapping::root_to(nix::unistd::getuid().as_raw()),
            gid: IdMapping::root_to(nix::unistd::getgid().as_raw()),
        }
    }

    /// Write the mapping for `pid` through `/proc`
    ///
    /// # Errors
    /// Returns error if any of the proc files cannot be written
    pub fn apply(&self, pid: ProcessId) -> Result<()> {
        self.apply_at(&PathBuf::from(format!("/proc/{pid}")))
    }

    /// Write the mapping into a `/proc/<pid>`-like directory
    ///
    /// `setgroups` is set to `deny` first when present; unprivileged
    /// writers may not set `gid_map` otherwise.
    ///
    /// # Errors
    /// Returns error if any of the files cannot be written
    pub fn apply_at(&self, proc_dir: &Path) -> Result<()> {
        let write = |name: &str, content: String| -> Result<()> {
            let path = proc_dir.join(name);
            fs::write(&path, content).map_err(|e| Error::Namespace {
                message: format!("Failed to write {}: {e}", path.display()),
            })
        };

        if proc_dir.join("setgroups").exists() {
            write("setgroups", "deny".to_string())?;
        }
        write("uid_map", self.uid.to_string())?;
        write("gid_map", self.gid.to_string())?;

        tracing::debug!(
            proc_dir = %proc_dir.display(),
            uid_map = %self.uid,
            gid_map = %self.gid,
            "Wrote UID/GID map"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mapping_format() {
        assert_eq!(IdMapping::root_to(1000).to_string(), "0 1000 1");
    }

    #[test]
    fn test_current_user() {
        let mapping = UserNamespaceMapping::current_user();
        assert_eq!(mapping.uid.inside, 0);
        assert_eq!(mapping.uid.count, 1);
        assert_eq!(mapping.uid.outside, nix::unistd::getuid().as_raw());
        assert_eq!(mapping.gid.outside, nix::unistd::getgid().as_raw());
    }

    #[test]
    fn test_apply_at_denies_setgroups() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("setgroups"), "allow").unwrap();

        let mapping = UserNamespaceMapping {
            uid: IdMapping::root_to(1000),
            gid: IdMapping::root_to(100),
        };
        mapping.apply_at(dir.path()).unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("setgroups"), "deny");
        assert_eq!(read("uid_map"), "0 1000 1");
        assert_eq!(read("gid_map"), "0 100 1");
    }

    #[test]
    fn test_apply_at_without_setgroups() {
        let dir = TempDir::new().unwrap();

        UserNamespaceMapping::current_user()
            .apply_at(dir.path())
            .unwrap();

        assert!(!dir.path().join("setgroups").exists());
        assert!(dir.path().join("uid_map").exists());
    }

    #[test]
    fn test_apply_at_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = UserNamespaceMapping::current_user()
            .apply_at(&dir.path().join("gone"))
            .unwrap_err();

        assert_eq!(err.kind(), lil_core::ErrorKind::Namespace);
    }
}
