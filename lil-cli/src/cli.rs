//! CLI argument definitions

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lil_core::stage::CGROUP_ROOT;
use lil_core::{
    ConfinementOptions, ContainerId, MembershipTarget, PidsLimit, Stage, TargetCommand,
};

#[derive(Parser, Debug)]
#[command(name = "lilcontainer")]
#[command(about = "Minimal process container", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command in a new container
    Run(RunArgs),

    /// Finish container setup and exec the command (internal)
    #[command(hide = true)]
    Child(ChildArgs),
}

/// Settings forwarded from `run` to `child`
#[derive(Args, Debug)]
pub struct ConfinementArgs {
    /// Container name, used as hostname and cgroup directory
    #[arg(long, default_value = ContainerId::DEFAULT)]
    pub name: ContainerId,

    /// Maximum number of processes in the container
    #[arg(long, default_value_t = PidsLimit::DEFAULT)]
    pub pids_max: PidsLimit,

    /// Mount point of the cgroup v2 hierarchy
    #[arg(long, default_value = CGROUP_ROOT)]
    pub cgroup_root: PathBuf,

    /// Process added to the cgroup: "parent" or "current"
    #[arg(long, default_value_t = MembershipTarget::Parent)]
    pub membership: MembershipTarget,
}

impl From<ConfinementArgs> for ConfinementOptions {
    fn from(args: ConfinementArgs) -> Self {
        Self {
            container_id: args.name,
            pids_limit: args.pids_max,
            cgroup_root: args.cgroup_root,
            membership: args.membership,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub confinement: ConfinementArgs,

    /// Remove the cgroup after the container exits
    #[arg(long)]
    pub cleanup: bool,

    /// Command to run
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,
}

impl RunArgs {
    /// Build the launch stage message
    pub fn into_stage(self) -> lil_core::Result<Stage> {
        Ok(Stage::Launch {
            options: self.confinement.into(),
            command: TargetCommand::new(self.command)?,
            cleanup: self.cleanup,
        })
    }
}

#[derive(Args, Debug)]
pub struct ChildArgs {
    #[command(flatten)]
    pub confinement: ConfinementArgs,

    /// Command to run
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(OsString)
    )]
    pub command: Vec<OsString>,
}

impl ChildArgs {
    /// Build the bootstrap stage message
    pub fn into_stage(self) -> lil_core::Result<Stage> {
        Ok(Stage::Bootstrap {
            options: self.confinement.into(),
            command: TargetCommand::new(self.command)?,
        })
    }
}
