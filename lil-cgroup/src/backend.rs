//! Resource backend trait for pluggable implementations

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use lil_core::{Error, PidsLimit, ProcessId, Result};

use crate::confine::ConfinementStep;

/// Trait for resource confinement backends
///
/// This allows for different implementations:
/// - [`CGroupController`](crate::CGroupController) - Production cgroup v2
/// - [`MockBackend`] - Testing without filesystem
///
/// # Thread Safety
/// All implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Create the group; an existing group is not an error
    ///
    /// # Errors
    /// Returns error if the group cannot be created
    async fn create(&self) -> Result<()>;

    /// Enable the pids controller for children of this group
    ///
    /// # Errors
    /// Returns error if the controller cannot be enabled
    async fn enable_pids_controller(&self) -> Result<()>;

    /// Set the process-count ceiling
    ///
    /// # Errors
    /// Returns error if limit cannot be set
    async fn set_pids_limit(&self, limit: PidsLimit) -> Result<()>;

    /// Enable or disable empty-group notification
    ///
    /// # Errors
    /// Returns error if the flag cannot be written
    async fn set_notify_on_release(&self, enabled: bool) -> Result<()>;

    /// Add a process to this resource group
    ///
    /// # Errors
    /// Returns error if process cannot be added
    async fn add_process(&self, pid: ProcessId) -> Result<()>;

    /// Remove the group; a missing group is not an error
    ///
    /// # Errors
    /// Returns error if removal fails
    async fn remove(&self) -> Result<()>;
}

/// A call recorded by [`MockBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    /// `create`
    Create,
    /// `enable_pids_controller`
    EnablePids,
    /// `set_pids_limit`
    SetPidsLimit(PidsLimit),
    /// `set_notify_on_release`
    SetNotifyOnRelease(bool),
    /// `add_process`
    AddProcess(ProcessId),
    /// `remove`
    Remove,
}

/// Mock backend for testing (doesn't touch filesystem)
///
/// Behaves like the real hierarchy where it matters: attribute writes fail
/// until the group exists, and creating it twice is fine.
///
/// # Example
/// ```
/// use lil_cgroup::{confine, ConfinementPlan, MockBackend};
/// use lil_core::{PidsLimit, ProcessId};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let backend = MockBackend::new();
/// let plan = ConfinementPlan::new(PidsLimit::default(), ProcessId::from_raw(1));
///
/// confine(&backend, &plan).await.unwrap();
///
/// assert_eq!(backend.pids_limit().await, Some(PidsLimit::default()));
/// assert!(backend.has_process(ProcessId::from_raw(1)).await);
/// # });
/// ```
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    exists: bool,
    pids_enabled: bool,
    pids_limit: Option<PidsLimit>,
    notify_on_release: bool,
    processes: Vec<ProcessId>,
    calls: Vec<MockCall>,
    fail_on: Option<ConfinementStep>,
}

impl MockState {
    fn record(&mut self, call: MockCall, step: Option<ConfinementStep>) -> Result<()> {
        self.calls.push(call);

        if step.is_some() && step == self.fail_on {
            return Err(Error::CGroup {
                message: format!("Mock: injected failure at {call:?}"),
            });
        }

        let needs_group = !matches!(call, MockCall::Create | MockCall::Remove);
        if needs_group && !self.exists {
            return Err(Error::CGroup {
                message: "Mock: group does not exist".to_string(),
            });
        }

        Ok(())
    }
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Make the given step fail (for testing error paths)
    #[must_use]
    pub fn failing_at(self, step: ConfinementStep) -> Self {
        if let Ok(mut state) = self.state.try_lock() {
            state.fail_on = Some(step);
        }
        self
    }

    /// Calls made so far, in order
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Get the number of backend calls made (for testing)
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Check if the group currently exists
    pub async fn exists(&self) -> bool {
        self.state.lock().await.exists
    }

    /// Check if a process has been added
    pub async fn has_process(&self, pid: ProcessId) -> bool {
        self.state.lock().await.processes.contains(&pid)
    }

    /// Check if the pids controller was enabled
    pub async fn pids_enabled(&self) -> bool {
        self.state.lock().await.pids_enabled
    }

    /// Get the current pids limit (for testing)
    pub async fn pids_limit(&self) -> Option<PidsLimit> {
        self.state.lock().await.pids_limit
    }

    /// Get the notification flag (for testing)
    pub async fn notify_on_release(&self) -> bool {
        self.state.lock().await.notify_on_release
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    async fn create(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(MockCall::Create, Some(ConfinementStep::Create))?;
        state.exists = true;

        tracing::debug!("Mock: Created group");

        Ok(())
    }

    async fn enable_pids_controller(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(MockCall::EnablePids, Some(ConfinementStep::EnableController))?;
        state.pids_enabled = true;

        tracing::debug!("Mock: Enabled pids controller");

        Ok(())
    }

    async fn set_pids_limit(&self, limit: PidsLimit) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(MockCall::SetPidsLimit(limit), Some(ConfinementStep::PidsLimit))?;
        state.pids_limit = Some(limit);

        tracing::debug!(max = limit.get(), "Mock: Set pids limit");

        Ok(())
    }

    async fn set_notify_on_release(&self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(
            MockCall::SetNotifyOnRelease(enabled),
            Some(ConfinementStep::NotifyOnRelease),
        )?;
        state.notify_on_release = enabled;

        tracing::debug!(enabled, "Mock: Set notify_on_release");

        Ok(())
    }

    async fn add_process(&self, pid: ProcessId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(MockCall::AddProcess(pid), Some(ConfinementStep::AddProcess))?;

        if !state.processes.contains(&pid) {
            state.processes.push(pid);
        }

        tracing::debug!(
            pid = pid.as_raw(),
            total_processes = state.processes.len(),
            "Mock: Added process"
        );

        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(MockCall::Remove, None)?;

        let calls = std::mem::take(&mut state.calls);
        let fail_on = state.fail_on;
        *state = MockState {
            calls,
            fail_on,
            ..MockState::default()
        };

        tracing::debug!("Mock: Removed group");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_lifecycle() {
        let backend = MockBackend::new();

        backend.create().await.unwrap();
        assert!(backend.exists().await);

        backend.enable_pids_controller().await.unwrap();
        assert!(backend.pids_enabled().await);

        let limit = PidsLimit::new(10).unwrap();
        backend.set_pids_limit(limit).await.unwrap();
        assert_eq!(backend.pids_limit().await, Some(limit));

        backend.set_notify_on_release(true).await.unwrap();
        assert!(backend.notify_on_release().await);

        let pid = ProcessId::from_raw(123);
        backend.add_process(pid).await.unwrap();
        assert!(backend.has_process(pid).await);
        assert_eq!(backend.call_count().await, 5);

        backend.remove().await.unwrap();
        assert!(!backend.exists().await);
        assert!(!backend.has_process(pid).await);
        assert_eq!(backend.calls().await.last(), Some(&MockCall::Remove));
    }

    #[tokio::test]
    async fn test_mock_backend_requires_group() {
        let backend = MockBackend::new();

        assert!(backend.set_pids_limit(PidsLimit::default()).await.is_err());
        assert!(backend.add_process(ProcessId::from_raw(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_backend_create_is_idempotent() {
        let backend = MockBackend::new();

        backend.create().await.unwrap();
        backend.set_pids_limit(PidsLimit::default()).await.unwrap();
        backend.create().await.unwrap();

        assert_eq!(backend.pids_limit().await, Some(PidsLimit::default()));
    }

    #[tokio::test]
    async fn test_mock_backend_duplicate_process() {
        let backend = MockBackend::new();
        let pid = ProcessId::from_raw(123);

        backend.create().await.unwrap();
        backend.add_process(pid).await.unwrap();
        backend.add_process(pid).await.unwrap();

        assert!(backend.has_process(pid).await);
        assert_eq!(backend.state.lock().await.processes.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_backend_injected_failure() {
        let backend = MockBackend::new().failing_at(ConfinementStep::PidsLimit);

        backend.create().await.unwrap();
        backend.enable_pids_controller().await.unwrap();
        assert!(backend.set_pids_limit(PidsLimit::default()).await.is_err());
        assert_eq!(backend.pids_limit().await, None);
    }
}
