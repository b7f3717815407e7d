//! The two-phase re-exec protocol
//!
//! A container run happens in two process images of the same binary. The
//! launcher runs as the original invocation and re-executes itself inside
//! new namespaces, handing the bootstrapper a [`Stage::Bootstrap`] message
//! encoded as its argument vector.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::{ContainerId, Error, MembershipTarget, PidsLimit, Result};

/// Default mount point of the cgroup v2 hierarchy
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Command line selector of the launcher phase
pub const RUN_SELECTOR: &str = "run";

/// Command line selector of the bootstrapper phase
pub const CHILD_SELECTOR: &str = "child";

/// The command to run inside the container
///
/// Opaque beyond being forwarded to `execvp(3)`. Arguments are kept as raw
/// OS strings, so bytes that are not valid UTF-8 pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl TargetCommand {
    /// Build from a full argument vector (`program` followed by its args)
    ///
    /// # Errors
    /// Returns a usage error if `argv` is empty or the program name is empty
    pub fn new<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().filter(|p| !p.is_empty()).ok_or_else(|| Error::Usage {
            message: "a command to run is required".to_string(),
        })?;

        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    /// Program name or path
    #[must_use]
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments after the program name
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Full argument vector, program first
    #[must_use]
    pub fn argv(&self) -> Vec<&OsStr> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .collect()
    }
}

/// Settings shared by both phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinementOptions {
    /// Hostname and control group name
    pub container_id: ContainerId,
    /// Value written to `pids.max`
    pub pids_limit: PidsLimit,
    /// Mount point of the cgroup v2 hierarchy
    pub cgroup_root: PathBuf,
    /// Process written to `cgroup.procs`
    pub membership: MembershipTarget,
}

impl Default for ConfinementOptions {
    fn default() -> Self {
        Self {
            container_id: ContainerId::default(),
            pids_limit: PidsLimit::default(),
            cgroup_root: PathBuf::from(CGROUP_ROOT),
            membership: MembershipTarget::default(),
        }
    }
}

impl ConfinementOptions {
    /// Full path of this container's control group
    #[must_use]
    pub fn cgroup_path(&self) -> PathBuf {
        self.cgroup_root.join(self.container_id.as_str())
    }

    /// Encode as command line flags understood by both sub-commands
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        vec![
            "--name".into(),
            self.container_id.as_str().into(),
            "--pids-max".into(),
            self.pids_limit.to_string().into(),
            "--cgroup-root".into(),
            self.cgroup_root.clone().into_os_string(),
            "--membership".into(),
            self.membership.as_str().into(),
        ]
    }
}

/// One phase of a container run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Original invocation: create namespaces and re-exec
    Launch {
        /// Shared settings
        options: ConfinementOptions,
        /// Command to run in the container
        command: TargetCommand,
        /// Remove the control group once the container exits
        cleanup: bool,
    },
    /// Re-exec target: finish setup and exec the command in place
    Bootstrap {
        /// Shared settings
        options: ConfinementOptions,
        /// Command to run in the container
        command: TargetCommand,
    },
}

impl Stage {
    /// Command line selector for this phase
    #[must_use]
    pub const fn selector(&self) -> &'static str {
        match self {
            Self::Launch { .. } => RUN_SELECTOR,
            Self::Bootstrap { .. } => CHILD_SELECTOR,
        }
    }

    /// Shared settings
    #[must_use]
    pub const fn options(&self) -> &ConfinementOptions {
        match self {
            Self::Launch { options, .. } | Self::Bootstrap { options, .. } => options,
        }
    }

    /// Command to run in the container
    #[must_use]
    pub const fn command(&self) -> &TargetCommand {
        match self {
            Self::Launch { command, .. } | Self::Bootstrap { command, .. } => command,
        }
    }

    /// The message the launcher hands to its re-executed self
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Launch {
                options, command, ..
            } => Some(Self::Bootstrap {
                options: options.clone(),
                command: command.clone(),
            }),
            Self::Bootstrap { .. } => None,
        }
    }

    /// Encode as an argument vector (without argv\[0\])
    ///
    /// The target command always follows `--` so its own flags are never
    /// mistaken for ours.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![self.selector().into()];
        args.extend(self.options().to_args());
        if let Self::Launch { cleanup: true, .. } = self {
            args.push("--cleanup".into());
        }
        args.push("--".into());
        args.extend(self.command().argv().into_iter().map(OsStr::to_os_string));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(argv: &[&str]) -> TargetCommand {
        TargetCommand::new(argv.iter().copied()).unwrap()
    }

    #[test]
    fn test_target_command_requires_program() {
        let err = TargetCommand::new(Vec::<String>::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Usage);

        assert!(TargetCommand::new(vec![String::new()]).is_err());
    }

    #[test]
    fn test_target_command_parts() {
        let cmd = command(&["/bin/sh", "-c", "echo hi"]);
        assert_eq!(cmd.program(), "/bin/sh");
        assert_eq!(cmd.args(), [OsString::from("-c"), OsString::from("echo hi")]);
        assert_eq!(
            cmd.argv(),
            [OsStr::new("/bin/sh"), OsStr::new("-c"), OsStr::new("echo hi")]
        );
    }

    #[test]
    fn test_cgroup_path() {
        let options = ConfinementOptions::default();
        assert_eq!(
            options.cgroup_path(),
            PathBuf::from("/sys/fs/cgroup/lilContainer")
        );
    }

    #[test]
    fn test_launch_becomes_bootstrap() {
        let launch = Stage::Launch {
            options: ConfinementOptions::default(),
            command: command(&["hostname"]),
            cleanup: true,
        };

        let next = launch.next().unwrap();
        assert_eq!(next.selector(), CHILD_SELECTOR);
        assert_eq!(next.command(), launch.command());
        assert_eq!(next.options(), launch.options());
        assert!(next.next().is_none());
    }

    #[test]
    fn test_bootstrap_args() {
        let stage = Stage::Bootstrap {
            options: ConfinementOptions::default(),
            command: command(&["ls", "-l", "--", "/"]),
        };

        let args = stage.to_args();
        assert_eq!(args[0], "child");

        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(&args[sep + 1..], ["ls", "-l", "--", "/"]);
        assert!(args[..sep].contains(&OsString::from("lilContainer")));
        assert!(args[..sep].contains(&OsString::from("100")));
        assert!(!args.contains(&OsString::from("--cleanup")));
    }

    #[test]
    fn test_launch_args_carry_cleanup() {
        let stage = Stage::Launch {
            options: ConfinementOptions::default(),
            command: command(&["true"]),
            cleanup: true,
        };

        let args = stage.to_args();
        assert_eq!(args[0], "run");
        assert!(args.contains(&OsString::from("--cleanup")));
    }

    #[test]
    fn test_non_utf8_arguments_are_forwarded() {
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"caf\xff");
        let stage = Stage::Bootstrap {
            options: ConfinementOptions::default(),
            command: TargetCommand::new([OsStr::new("printf"), raw]).unwrap(),
        };

        let args = stage.to_args();
        assert_eq!(args.last().map(|a| a.as_bytes()), Some(&b"caf\xff"[..]));
    }
}
