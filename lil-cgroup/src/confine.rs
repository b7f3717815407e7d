//! Ordered control group setup
//!
//! Builds a pids-limited group and joins it. The order is fixed: the group
//! has to exist before any attribute is written, and the pids controller
//! has to be enabled before its limit means anything.

use std::fmt;

use lil_core::{PidsLimit, ProcessId, Result};
use tracing::{debug, error, info};

use crate::backend::ResourceBackend;

/// One step of [`confine`], in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfinementStep {
    /// Create the group directory
    Create,
    /// Enable the pids controller
    EnableController,
    /// Write `pids.max`
    PidsLimit,
    /// Write `notify_on_release`
    NotifyOnRelease,
    /// Write `cgroup.procs`
    AddProcess,
}

impl ConfinementStep {
    /// All steps in execution order
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::EnableController,
        Self::PidsLimit,
        Self::NotifyOnRelease,
        Self::AddProcess,
    ];
}

impl fmt::Display for ConfinementStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create group",
            Self::EnableController => "enable pids controller",
            Self::PidsLimit => "set pids limit",
            Self::NotifyOnRelease => "set notify_on_release",
            Self::AddProcess => "add process",
        };
        f.write_str(name)
    }
}

/// What [`confine`] writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfinementPlan {
    /// Value for `pids.max`
    pub pids_limit: PidsLimit,
    /// Value for `notify_on_release`
    pub notify_on_release: bool,
    /// Process written to `cgroup.procs`
    pub member: ProcessId,
}

impl ConfinementPlan {
    /// Plan with empty-group notification enabled
    #[must_use]
    pub const fn new(pids_limit: PidsLimit, member: ProcessId) -> Self {
        Self {
            pids_limit,
            notify_on_release: true,
            member,
        }
    }
}

/// Create, configure and join a process-count limited group
///
/// Stops at the first failing step. Nothing is rolled back.
///
/// # Errors
/// Returns the error of the first step that failed
pub async fn confine(backend: &dyn ResourceBackend, plan: &ConfinementPlan) -> Result<()> {
    info!(
        pids_max = plan.pids_limit.get(),
        member = plan.member.as_raw(),
        "Confining container"
    );

    for step in ConfinementStep::ALL {
        debug!(%step, "Confinement step");

        let result = match step {
            ConfinementStep::Create => backend.create().await,
            ConfinementStep::EnableController => backend.enable_pids_controller().await,
            ConfinementStep::PidsLimit => backend.set_pids_limit(plan.pids_limit).await,
            ConfinementStep::NotifyOnRelease => {
                backend.set_notify_on_release(plan.notify_on_release).await
            }
            ConfinementStep::AddProcess => backend.add_process(plan.member).await,
        };

        if let Err(e) = result {
            error!(%step, error = %e, "Confinement failed");
            return Err(e);
        }
    }

    debug!("Confinement complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockCall};

    fn plan() -> ConfinementPlan {
        ConfinementPlan::new(PidsLimit::default(), ProcessId::from_raw(0))
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let backend = MockBackend::new();
        confine(&backend, &plan()).await.unwrap();

        assert_eq!(
            backend.calls().await,
            vec![
                MockCall::Create,
                MockCall::EnablePids,
                MockCall::SetPidsLimit(PidsLimit::default()),
                MockCall::SetNotifyOnRelease(true),
                MockCall::AddProcess(ProcessId::from_raw(0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        for failing in ConfinementStep::ALL {
            let backend = MockBackend::new().failing_at(failing);
            assert!(confine(&backend, &plan()).await.is_err());

            // The failing step is the last one attempted
            let calls = backend.calls().await;
            let attempted = ConfinementStep::ALL
                .iter()
                .position(|s| *s == failing)
                .unwrap()
                + 1;
            assert_eq!(calls.len(), attempted, "failing at {failing}");
        }
    }

    #[tokio::test]
    async fn test_rerun_is_tolerated() {
        let backend = MockBackend::new();
        confine(&backend, &plan()).await.unwrap();
        confine(&backend, &plan()).await.unwrap();

        assert_eq!(backend.pids_limit().await, Some(PidsLimit::default()));
        assert!(backend.notify_on_release().await);
    }

    #[test]
    fn test_plan_defaults() {
        let plan = plan();
        assert!(plan.notify_on_release);
        assert_eq!(plan.pids_limit.get(), 100);
    }
}
