//! lilcontainer core - shared types, errors, and the re-exec protocol
//!
//! This crate provides the vocabulary used by the launcher, the bootstrapper
//! and the resource confinement manager.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod stage;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use stage::{ConfinementOptions, Stage, TargetCommand};
pub use types::{ContainerId, MembershipTarget, PidsLimit, ProcessId};
