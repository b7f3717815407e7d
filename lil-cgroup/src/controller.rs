//! CGroup controller implementation

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lil_core::{ConfinementOptions, ContainerId, Error, PidsLimit, ProcessId, Result};
use tokio::fs;
use tracing::debug;

use crate::backend::ResourceBackend;

/// Main CGroup controller
///
/// This struct represents a cgroup v2 directory in the filesystem
/// hierarchy. It provides methods to:
/// - Create and remove the group
/// - Enable the pids controller and set its limit
/// - Add processes and list members
///
/// Constructing a controller touches nothing on disk; see [`Self::create`].
#[derive(Debug, Clone)]
pub struct CGroupController {
    /// Container ID (used for cgroup name)
    pub(crate) container_id: ContainerId,

    /// Full path to this group directory
    /// example: /sys/fs/cgroup/lilContainer
    pub(crate) path: PathBuf,
}

impl CGroupController {
    /// Create a controller for `<root>/<container_id>`
    #[must_use]
    pub fn new(root: impl AsRef<Path>, container_id: ContainerId) -> Self {
        let path = root.as_ref().join(container_id.as_str());
        Self { container_id, path }
    }

    /// Create a controller from the shared run settings
    #[must_use]
    pub fn for_options(options: &ConfinementOptions) -> Self {
        Self::new(&options.cgroup_root, options.container_id.clone())
    }

    /// Get the container ID
    #[must_use]
    pub const fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    /// Get the group directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the cgroup directory
    ///
    /// An already existing directory is accepted as-is.
    pub async fn create(&self) -> Result<()> {
        debug!("Creating cgroup at: {}", self.path.display());

        let mut builder = fs::DirBuilder::new();
        builder.mode(0o755);

        match builder.create(&self.path).await {
            Ok(()) => {
                debug!("CGroup created successfully: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("CGroup already exists: {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(Error::CGroup {
                message: format!(
                    "Failed to create cgroup directory {}: {}",
                    self.path.display(),
                    e
                ),
            }),
        }
    }

    /// Add a process to this group
    pub async fn add_process(&self, pid: ProcessId) -> Result<()> {
        debug!("Adding process {} to cgroup", pid);
        self.write_attribute("cgroup.procs", &pid.to_string()).await
    }

    /// List member processes
    pub async fn processes(&self) -> Result<Vec<ProcessId>> {
        let content = self.read_attribute("cgroup.procs").await?;

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse::<i32>()
                    .map(ProcessId::from_raw)
                    .map_err(|e| Error::CGroup {
                        message: format!("Invalid pid '{line}' in cgroup.procs: {e}"),
                    })
            })
            .collect()
    }

    /// Remove the cgroup directory
    ///
    /// The kernel refuses while members remain. A missing directory is
    /// accepted.
    pub async fn remove(&self) -> Result<()> {
        debug!("Removing cgroup: {}", self.path.display());

        match fs::remove_dir(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("CGroup already gone: {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(Error::CGroup {
                message: format!("Failed to remove cgroup {}: {}", self.path.display(), e),
            }),
        }
    }

    /// Write a whole attribute file, creating it if needed
    pub(crate) async fn write_attribute(&self, name: &str, value: &str) -> Result<()> {
        let file = self.path.join(name);

        fs::write(&file, value)
            .await
            .map_err(|e| Error::CGroup {
                message: format!("Failed to write {}: {}", file.display(), e),
            })
    }

    /// Read an attribute file
    pub async fn read_attribute(&self, name: &str) -> Result<String> {
        let file = self.path.join(name);

        fs::read_to_string(&file)
            .await
            .map_err(|e| Error::CGroup {
                message: format!("Failed to read {}: {}", file.display(), e),
            })
    }
}

#[async_trait]
impl ResourceBackend for CGroupController {
    async fn create(&self) -> Result<()> {
        Self::create(self).await
    }

    async fn enable_pids_controller(&self) -> Result<()> {
        Self::enable_pids_controller(self).await
    }

    async fn set_pids_limit(&self, limit: PidsLimit) -> Result<()> {
        Self::set_pids_limit(self, limit).await
    }

    async fn set_notify_on_release(&self, enabled: bool) -> Result<()> {
        Self::set_notify_on_release(self, enabled).await
    }

    async fn add_process(&self, pid: ProcessId) -> Result<()> {
        Self::add_process(self, pid).await
    }

    async fn remove(&self) -> Result<()> {
        Self::remove(self).await
    }
}
