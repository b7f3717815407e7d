//! Error types for lilcontainer

pub use nix::errno::Errno;
use thiserror::Error;

/// lilcontainer error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Wrong or missing arguments
    #[error("Usage error: {message}")]
    Usage {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `CGroup` operation failed
    #[error("CGroup error: {message}")]
    CGroup {
        /// Error message
        message: String,
    },

    /// Namespace operation failed
    #[error("Namespace error: {message}")]
    Namespace {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),

    /// The target command could not be started
    #[error("Failed to execute {program}: {errno}")]
    Exec {
        /// Program that was being executed
        program: String,
        /// Reason reported by execvp(2)
        errno: Errno,
    },
}

/// Coarse classification of an [`Error`]
///
/// Lets callers tell usage mistakes apart from environment failures and
/// from problems with the contained command itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong or missing arguments
    Usage,
    /// The kernel refused the requested isolation
    Namespace,
    /// Control group configuration failed
    CGroup,
    /// Generic I/O failure outside of the above
    Io,
    /// The contained command failed to start
    Command,
}

impl Error {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage { .. } | Self::InvalidConfig { .. } => ErrorKind::Usage,
            Self::Namespace { .. } | Self::System(_) => ErrorKind::Namespace,
            Self::CGroup { .. } => ErrorKind::CGroup,
            Self::Io(_) => ErrorKind::Io,
            Self::Exec { .. } => ErrorKind::Command,
        }
    }

    /// Process exit status to report for this error
    ///
    /// Follows shell conventions: 2 for usage, 126 when the command is not
    /// executable, 127 when it cannot be found, 1 for everything else.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } | Self::InvalidConfig { .. } => 2,
            Self::Exec {
                errno: Errno::EACCES | Errno::EPERM | Errno::ENOEXEC,
                ..
            } => 126,
            Self::Exec { .. } => 127,
            _ => 1,
        }
    }
}

/// Result type alias for lilcontainer operations
pub type Result<T> = std::result::Result<T, Error>;
