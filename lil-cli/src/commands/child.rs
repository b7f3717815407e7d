//! Child command implementation (bootstrap phase)
//!
//! Runs inside the namespaces created by `run`: sets the hostname, joins a
//! pids-limited cgroup, then replaces itself with the target command.

use anyhow::{Context, Result};
use lil_cgroup::{confine, CGroupController, ConfinementPlan};
use lil_core::ProcessId;
use lil_namespace::{exec_command, NamespaceConfig, NamespaceManager};
use tracing::info;

use crate::cli::ChildArgs;

pub async fn execute(args: ChildArgs) -> Result<i32> {
    let stage = args.into_stage().context("Invalid child arguments")?;
    let options = stage.options();

    info!(pid = %ProcessId::current(), "👶 Bootstrapping container");

    // 1. Hostname
    let namespaces = NamespaceManager::new(
        NamespaceConfig::container().with_hostname(options.container_id.as_str()),
    );
    namespaces.setup_uts().context("Failed to set hostname")?;

    // 2. Control group
    let cgroup = CGroupController::for_options(options);
    let member = options.membership.resolve();
    let plan = ConfinementPlan::new(options.pids_limit, member);

    confine(&cgroup, &plan)
        .await
        .with_context(|| format!("Failed to set up cgroup {}", cgroup.path().display()))?;

    info!(
        cgroup = %cgroup.path().display(),
        membership = %options.membership,
        member = %member,
        "🔗 Joined cgroup"
    );

    // 3. Target command, in place
    let never = exec_command(stage.command()).context("Failed to start contained command")?;
    match never {}
}
