//! Run command implementation (launcher phase)

use anyhow::{Context, Result};
use lil_cgroup::CGroupController;
use lil_core::Stage;
use lil_namespace::{Launcher, NamespaceConfig};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;

pub async fn execute(args: RunArgs) -> Result<i32> {
    let stage = args.into_stage().context("Invalid run arguments")?;
    let options = stage.options();

    info!(
        container = %options.container_id,
        pid = %lil_core::ProcessId::current(),
        command = ?stage.command().argv(),
        "🚀 Starting container"
    );

    let launcher =
        Launcher::new(NamespaceConfig::container()).context("Failed to resolve own executable")?;

    // Blocks until the container exits
    let exit_code = launcher
        .launch(&stage)
        .context("Failed to launch container")?;

    if matches!(stage, Stage::Launch { cleanup: true, .. }) {
        let cgroup = CGroupController::for_options(options);
        debug!("🧹 Removing cgroup {}", cgroup.path().display());

        if let Err(e) = cgroup.remove().await {
            warn!("Could not remove cgroup: {}", e);
        }
    }

    if exit_code == 0 {
        info!("✅ Container stopped successfully");
    } else {
        warn!("⚠️  Container exited with code: {}", exit_code);
    }

    Ok(exit_code)
}
