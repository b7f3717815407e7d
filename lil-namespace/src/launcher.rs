//! Launching a re-executed copy of ourselves in new namespaces
//!
//! This module uses `unsafe` for clone(2) which is inherently unsafe
//! but necessary for creating the PID namespace at process creation.
//!
//! The launcher clones a child into the configured namespaces, writes the
//! child's UID/GID maps from the outside, then releases it through a pipe.
//! The child detaches its mounts and execs the bootstrap stage of this
//! same binary.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Write;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sched::clone;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execv, pipe2, Pid};
use tracing::{debug, error, info, warn};
use lil_core::{Error, ProcessId, Result, Stage};

use crate::config::NamespaceConfig;
use crate::exec::to_cstrings;
use crate::idmap::UserNamespaceMapping;
use crate::manager::NamespaceManager;

/// Stack size for the cloned child before it execs
const STACK_SIZE: usize = 1024 * 1024;

/// Byte sent through the start barrier once the child may proceed
const BARRIER_GO: u8 = 1;

/// Exit status of the child when setup before exec fails
const SETUP_FAILED: isize = 1;

/// Starts the bootstrap stage in new namespaces and waits for it
#[derive(Debug, Clone)]
pub struct Launcher {
    config: NamespaceConfig,
    mapping: UserNamespaceMapping,
    executable: PathBuf,
}

impl Launcher {
    /// Create a launcher that re-executes the running binary
    ///
    /// # Errors
    /// Returns error if the running binary cannot be resolved
    pub fn new(config: NamespaceConfig) -> Result<Self> {
        let executable = std::env::current_exe()?;

        Ok(Self {
            config,
            mapping: UserNamespaceMapping::current_user(),
            executable,
        })
    }

    /// Re-execute a different binary (for testing)
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Use a different identity mapping
    #[must_use]
    pub const fn with_mapping(mut self, mapping: UserNamespaceMapping) -> Self {
        self.mapping = mapping;
        self
    }

    /// Binary that will be re-executed
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Argument vector of the re-executed process, argv\[0\] included
    ///
    /// # Errors
    /// Returns error if `stage` is not a launch stage or an argument
    /// contains a NUL byte
    pub fn reexec_argv(&self, stage: &Stage) -> Result<Vec<CString>> {
        let next = stage.next().ok_or_else(|| Error::InvalidConfig {
            message: format!("cannot launch from the '{}' stage", stage.selector()),
        })?;

        let mut argv = vec![self.executable.as_os_str().as_bytes().to_vec()];
        argv.extend(next.to_args().iter().map(|a| a.as_bytes().to_vec()));

        to_cstrings(&argv)
    }

    /// Run `stage` to completion and return the container's exit code
    ///
    /// Blocks until the child exits. A child killed by signal N yields
    /// 128 + N.
    ///
    /// # Errors
    /// Returns error if the child cannot be created or its identity
    /// mapping cannot be written
    pub fn launch(&self, stage: &Stage) -> Result<i32> {
        let argv = self.reexec_argv(stage)?;
        let executable = to_cstrings(&[self.executable.as_os_str().as_bytes()])?
            .pop()
            .ok_or_else(|| Error::InvalidConfig {
                message: "empty executable path".to_string(),
            })?;

        let flags = self.config.to_clone_flags();
        info!(
            namespaces = ?self.config.enabled_namespaces(),
            executable = %self.executable.display(),
            "Launching container"
        );

        let (barrier_rx, barrier_tx) = pipe2(OFlag::O_CLOEXEC).map_err(|e| Error::Namespace {
            message: format!("Failed to create start barrier: {e}"),
        })?;
        let rx = barrier_rx.as_raw_fd();
        let tx = barrier_tx.as_raw_fd();
        let private_mounts = self.config.mount && self.config.private_mounts;

        let mut stack = vec![0u8; STACK_SIZE];
        let child_main = Box::new(|| bootstrap_entry(rx, tx, private_mounts, &executable, &argv));

        // SAFETY: the child only touches data prepared above and execs or
        // exits; the process is single threaded at this point.
        let child = unsafe { clone(child_main, &mut stack, flags, Some(Signal::SIGCHLD as i32)) }
            .map_err(|e| {
                error!(error = %e, "Failed to create namespaces");
                Error::Namespace {
                    message: format!("clone failed: {e}"),
                }
            })?;

        drop(barrier_rx);
        let child_pid = ProcessId::from(child);
        debug!(pid = child_pid.as_raw(), "Child created");

        if let Err(e) = self.release(child_pid, File::from(barrier_tx)) {
            // The child sees a closed barrier and exits on its own
            match waitpid(child, None) {
                Ok(status) => debug!(?status, "Reaped unreleased child"),
                Err(errno) => debug!(%errno, "Failed to reap unreleased child"),
            }
            return Err(e);
        }

        wait_for_exit(child)
    }

    /// Write the child's identity mapping, then let it proceed
    fn release(&self, child: ProcessId, mut barrier: File) -> Result<()> {
        if self.config.user {
            self.mapping.apply(child)?;
        }

        if let (Ok(ours), Ok(theirs)) = (
            NamespaceManager::current_namespaces(),
            NamespaceManager::namespaces_for_pid(child),
        ) {
            debug!(isolated = ?theirs.differs_from(&ours), "Child namespaces");
        }

        barrier.write_all(&[BARRIER_GO]).map_err(|e| Error::Namespace {
            message: format!("Failed to release child: {e}"),
        })
    }
}

/// First code run by the cloned child
///
/// Waits for the parent's go signal, detaches mount propagation and execs
/// the bootstrap stage. Returns only on failure, as the child's exit code.
fn bootstrap_entry(
    rx: RawFd,
    tx: RawFd,
    private_mounts: bool,
    executable: &CStr,
    argv: &[CString],
) -> isize {
    // SAFETY: tx is this process's copy of the barrier's write end
    unsafe { libc::close(tx) };

    let mut go = [0u8; 1];
    let n = loop {
        // SAFETY: reading one byte into a valid local buffer
        let n = unsafe { libc::read(rx, go.as_mut_ptr().cast(), 1) };
        if n >= 0 || Errno::last() != Errno::EINTR {
            break n;
        }
    };
    if n != 1 || go[0] != BARRIER_GO {
        // Parent gave up before releasing us
        return SETUP_FAILED;
    }

    if private_mounts {
        if let Err(e) = NamespaceManager::make_mounts_private() {
            eprintln!("❌ {e}");
            return SETUP_FAILED;
        }
    }

    let errno = match execv(executable, argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };
    eprintln!("❌ Failed to re-execute {}: {errno}", executable.to_string_lossy());
    SETUP_FAILED
}

/// Wait for the child to exit and translate its status
fn wait_for_exit(child_pid: Pid) -> Result<i32> {
    debug!("Parent: Waiting for child to exit...");

    loop {
        match waitpid(child_pid, None) {
            Ok(WaitStatus::Exited(_, exit_code)) => {
                info!("👋 Container exited with code: {}", exit_code);
                return Ok(exit_code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                warn!("Container terminated by signal: {:?}", signal);
                // Exit codes for signals: 128 + signal number
                return Ok(128 + signal as i32);
            }
            Ok(status) => {
                debug!("Child status: {:?}", status);
            }
            Err(Errno::EINTR) => {
                debug!("Wait interrupted by signal, continuing...");
            }
            Err(e) => {
                error!("Wait failed: {}", e);
                return Err(Error::Namespace {
                    message: format!("Wait failed: {e}"),
                });
            }
        }
    }
}
