//! CGroup v2 process-count confinement with pluggable backends
//!
//! This crate provides a trait-based abstraction over the cgroup v2
//! pseudo-filesystem for confining a container to a process-count ceiling,
//! including production and mock implementations.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod confine;
pub mod controller;
pub mod limits;

pub use backend::{MockBackend, MockCall, ResourceBackend};
pub use confine::{confine, ConfinementPlan, ConfinementStep};
pub use controller::CGroupController;

// Re-export commonly used types
pub use lil_core::{PidsLimit, ProcessId};

/// Controller that bounds the number of processes
pub const PIDS_CONTROLLER: &str = "pids";
