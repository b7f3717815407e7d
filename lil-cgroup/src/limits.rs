//! Process-count limit implementation
//!
//! This module provides methods for enabling the pids controller and
//! bounding the number of processes by writing to cgroup v2 control files

use crate::controller::CGroupController;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use lil_core::{Error, PidsLimit, Result};

impl CGroupController {
    /// Enable the pids controller for children of this cgroup
    ///
    /// `cgroup.subtree_control` is provided by the kernel, so it is opened
    /// without `O_CREAT`: a missing file means this is not a cgroup.
    pub async fn enable_pids_controller(&self) -> Result<()> {
        let control_file = self.path.join("cgroup.subtree_control");
        let token = format!("+{}", crate::PIDS_CONTROLLER);

        debug!("Enabling controllers in {}: {}", self.path.display(), token);

        let write = async {
            let mut file = OpenOptions::new().write(true).open(&control_file).await?;
            file.write_all(token.as_bytes()).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        };

        write.await.map_err(|e| Error::CGroup {
            message: format!("Enable controllers in {}: {}", self.path.display(), e),
        })
    }

    /// Set the process-count ceiling for this cgroup
    ///
    /// Once reached, fork(2) and clone(2) inside the group fail with
    /// `EAGAIN`.
    pub async fn set_pids_limit(&self, limit: PidsLimit) -> Result<()> {
        debug!("Setting pids limit to {}", limit);
        self.write_attribute("pids.max", &limit.to_string()).await
    }

    /// Read the configured ceiling; `None` means unlimited
    pub async fn pids_limit(&self) -> Result<Option<PidsLimit>> {
        let content = self.read_attribute("pids.max").await?;

        match content.trim() {
            "max" => Ok(None),
            value => value.parse().map(Some),
        }
    }

    /// Enable or disable empty-group notification
    pub async fn set_notify_on_release(&self, enabled: bool) -> Result<()> {
        debug!("Setting notify_on_release to {}", enabled);
        self.write_attribute("notify_on_release", if enabled { "1" } else { "0" })
            .await
    }

    /// Read the empty-group notification flag
    pub async fn notify_on_release(&self) -> Result<bool> {
        let content = self.read_attribute("notify_on_release").await?;
        Ok(content.trim() == "1")
    }
}
