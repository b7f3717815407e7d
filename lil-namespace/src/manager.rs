//! Setup performed from inside the new namespaces

use nix::mount::{mount, MsFlags};
use nix::unistd::sethostname;
use lil_core::{Error, ProcessId, Result};

use crate::config::NamespaceConfig;

/// Namespace manager for finishing setup inside created namespaces
#[derive(Debug)]
pub struct NamespaceManager {
    config: NamespaceConfig,
}

impl NamespaceManager {
    /// Create a new namespace manager
    #[must_use]
    pub const fn new(config: NamespaceConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// Set the hostname of the current UTS namespace
    ///
    /// Does nothing when no hostname is configured.
    ///
    /// # Errors
    /// Returns error if sethostname(2) fails
    pub fn setup_uts(&self) -> Result<()> {
        let Some(ref hostname) = self.config.hostname else {
            return Ok(());
        };

        if !self.config.uts {
            tracing::warn!(
                hostname = %hostname,
                "Setting hostname without a UTS namespace affects the host"
            );
        }

        tracing::debug!(hostname = %hostname, "Setting hostname");

        sethostname(hostname).map_err(|e| {
            tracing::error!(
                hostname = %hostname,
                error = %e,
                "Failed to set hostname"
            );
            Error::Namespace {
                message: format!("Failed to set hostname: {e}"),
            }
        })
    }

    /// Make every mount under `/` private to the current mount namespace
    ///
    /// Mount events then no longer propagate to or from the host.
    ///
    /// # Errors
    /// Returns error if mount(2) fails
    pub fn make_mounts_private() -> Result<()> {
        mount(
            None::<&str>,
            "/",
            None::<&str>,
            MsFlags::MS_REC | MsFlags::MS_PRIVATE,
            None::<&str>,
        )
        .map_err(|e| Error::Namespace {
            message: format!("Failed to make mounts private: {e}"),
        })
    }

    /// Get current namespace IDs
    ///
    /// # Errors
    /// Returns error if reading namespace IDs fails
    pub fn current_namespaces() -> Result<NamespaceInfo> {
        Self::namespaces_for_pid(ProcessId::current())
    }

    /// Get namespace IDs for a specific PID
    ///
    /// Namespaces that cannot be read are left as `None`.
    ///
    /// # Errors
    /// Returns error if the process has no readable namespace directory
    pub fn namespaces_for_pid(pid: ProcessId) -> Result<NamespaceInfo> {
        use std::fs;

        let base_path = format!("/proc/{pid}/ns");

        fs::metadata(&base_path).map_err(|e| Error::Namespace {
            message: format!("Failed to read {base_path}: {e}"),
        })?;

        let read_ns = |name: &str| -> Option<String> {
            fs::read_link(format!("{base_path}/{name}"))
                .map(|p| p.to_string_lossy().into_owned())
                .ok()
        };

        Ok(NamespaceInfo {
            pid: read_ns("pid"),
            net: read_ns("net"),
            mnt: read_ns("mnt"),
            uts: read_ns("uts"),
            ipc: read_ns("ipc"),
            user: read_ns("user"),
            cgroup: read_ns("cgroup"),
        })
    }
}

/// Information about current namespaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceInfo {
    /// PID namespace ID
    pub pid: Option<String>,
    /// Network namespace ID
    pub net: Option<String>,
    /// Mount namespace ID
    pub mnt: Option<String>,
    /// UTS namespace ID
    pub uts: Option<String>,
    /// IPC namespace ID
    pub ipc: Option<String>,
    /// User namespace ID
    pub user: Option<String>,
    /// CGroup namespace ID
    pub cgroup: Option<String>,
}

impl NamespaceInfo {
    fn entries(&self) -> [(&'static str, &Option<String>); 7] {
        [
            ("pid", &self.pid),
            ("net", &self.net),
            ("mnt", &self.mnt),
            ("uts", &self.uts),
            ("ipc", &self.ipc),
            ("user", &self.user),
            ("cgroup", &self.cgroup),
        ]
    }

    /// Names of namespaces that are known on both sides and differ
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .zip(other.entries())
            .filter_map(|((name, ours), (_, theirs))| match (ours, theirs) {
                (Some(a), Some(b)) if a != b => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Display for NamespaceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Namespace Info:")?;
        for (name, value) in self.entries() {
            if let Some(value) = value {
                let label = format!("{}:", name.to_uppercase());
                writeln!(f, "  {label:<8}{value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_creation() {
        let config = NamespaceConfig::container().with_hostname("lilContainer");
        let manager = NamespaceManager::new(config);

        assert!(manager.config().has_any());
        assert_eq!(manager.config().hostname.as_deref(), Some("lilContainer"));
    }

    #[test]
    fn test_setup_uts_without_hostname() {
        let manager = NamespaceManager::new(NamespaceConfig::container());
        assert!(manager.setup_uts().is_ok());
    }

    #[test]
    fn test_current_namespaces() {
        let info = NamespaceManager::current_namespaces().unwrap();
        assert!(info.pid.is_some());
        assert!(info.differs_from(&info).is_empty());
    }

    #[test]
    fn test_missing_process() {
        assert!(NamespaceManager::namespaces_for_pid(ProcessId::from_raw(-1)).is_err());
    }

    #[test]
    fn test_differs_from() {
        let host = NamespaceInfo {
            pid: Some("pid:[4026531836]".to_string()),
            uts: Some("uts:[4026531838]".to_string()),
            net: Some("net:[4026531905]".to_string()),
            ..Default::default()
        };
        let container = NamespaceInfo {
            pid: Some("pid:[4026532201]".to_string()),
            uts: Some("uts:[4026532200]".to_string()),
            net: Some("net:[4026531905]".to_string()),
            ..Default::default()
        };

        assert_eq!(container.differs_from(&host), vec!["pid", "uts"]);
    }

    #[test]
    fn test_namespace_info_display() {
        let info = NamespaceInfo {
            pid: Some("pid:[4026531836]".to_string()),
            net: Some("net:[4026531905]".to_string()),
            ..Default::default()
        };

        let display = format!("{info}");
        assert!(display.contains("PID:"));
        assert!(display.contains("NET:"));
        assert!(!display.contains("UTS:"));
    }
}
