//! Namespace isolation for the container launcher
//!
//! This crate provides the Linux namespace side of a container run:
//! - Launcher - clone(2) into new namespaces and re-exec the bootstrap stage
//! - User namespace mapping - virtual root mapped to the invoking user
//! - UTS namespace - hostname virtualization
//! - Mount namespace - detaching mount propagation from the host
//! - Exec - replacing the bootstrapper with the target command

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod config;
pub mod exec;
pub mod idmap;
pub mod launcher;
pub mod manager;

pub use config::NamespaceConfig;
pub use exec::exec_command;
pub use idmap::{IdMapping, UserNamespaceMapping};
pub use launcher::Launcher;
pub use manager::{NamespaceInfo, NamespaceManager};
