//! Namespace configuration

use nix::sched::CloneFlags;
use serde::{Deserialize, Serialize};

/// Namespace configuration
///
/// Describes which isolation boundaries a re-executed process is created
/// in. Namespaces are fixed at clone(2) time and cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Enable PID namespace
    pub pid: bool,

    /// Enable network namespace
    pub network: bool,

    /// Enable mount namespace
    pub mount: bool,

    /// Enable UTS namespace (hostname)
    pub uts: bool,

    /// Enable user namespace
    pub user: bool,

    /// Enable cgroup namespace
    pub cgroup: bool,

    /// Detach the new mount namespace from the host's propagation tree
    pub private_mounts: bool,

    /// Hostname for UTS namespace
    pub hostname: Option<String>,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self::container()
    }
}

impl NamespaceConfig {
    /// No namespaces at all
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pid: false,
            network: false,
            mount: false,
            uts: false,
            user: false,
            cgroup: false,
            private_mounts: false,
            hostname: None,
        }
    }

    /// The isolation set used for containers
    ///
    /// PID, UTS, user, network, mount and cgroup namespaces, with mount
    /// propagation detached from the host.
    #[must_use]
    pub const fn container() -> Self {
        Self {
            pid: true,
            network: true,
            mount: true,
            uts: true,
            user: true,
            cgroup: true,
            private_mounts: true,
            hostname: None,
        }
    }

    /// Set hostname for UTS namespace
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Convert to clone flags for clone(2)
    #[must_use]
    pub fn to_clone_flags(&self) -> CloneFlags {
        let mut flags = CloneFlags::empty();

        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }
        if self.cgroup {
            flags |= CloneFlags::CLONE_NEWCGROUP;
        }

        flags
    }

    /// Check if any namespaces are enabled
    #[must_use]
    pub const fn has_any(&self) -> bool {
        self.pid || self.network || self.mount || self.uts || self.user || self.cgroup
    }

    /// Get list of enabled namespace names
    #[must_use]
    pub fn enabled_namespaces(&self) -> Vec<&'static str> {
        let mut namespaces = Vec::new();

        if self.pid {
            namespaces.push("pid");
        }
        if self.network {
            namespaces.push("net");
        }
        if self.mount {
            namespaces.push("mnt");
        }
        if self.uts {
            namespaces.push("uts");
        }
        if self.user {
            namespaces.push("user");
        }
        if self.cgroup {
            namespaces.push("cgroup");
        }

        namespaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NamespaceConfig::default();
        assert!(config.pid);
        assert!(config.network);
        assert!(config.mount);
        assert!(config.uts);
        assert!(config.user);
        assert!(config.cgroup);
        assert!(config.private_mounts);
    }

    #[test]
    fn test_with_hostname() {
        let config = NamespaceConfig::new().with_hostname("test-container");

        assert!(!config.has_any());
        assert_eq!(config.hostname.as_deref(), Some("test-container"));
    }

    #[test]
    fn test_container_clone_flags() {
        let flags = NamespaceConfig::container().to_clone_flags();

        assert_eq!(
            flags,
            CloneFlags::CLONE_NEWPID
                | CloneFlags::CLONE_NEWUTS
                | CloneFlags::CLONE_NEWUSER
                | CloneFlags::CLONE_NEWNET
                | CloneFlags::CLONE_NEWNS
                | CloneFlags::CLONE_NEWCGROUP
        );
        assert!(!flags.contains(CloneFlags::CLONE_NEWIPC));
    }

    #[test]
    fn test_enabled_namespaces() {
        let config = NamespaceConfig {
            pid: true,
            mount: true,
            ..NamespaceConfig::new()
        };
        let enabled = config.enabled_namespaces();

        assert_eq!(enabled, vec!["pid", "mnt"]);
        assert!(!NamespaceConfig::new().has_any());
    }

    #[test]
    fn test_config_serde() {
        let config = NamespaceConfig::container().with_hostname("lilContainer");
        let json = serde_json::to_string(&config).unwrap();
        let back: NamespaceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
