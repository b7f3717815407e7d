//! In-place execution of the target command

use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

use lil_core::{Error, Result, TargetCommand};
use tracing::info;

/// Convert an argument vector to C strings
///
/// # Errors
/// Returns error if any argument contains a NUL byte
pub fn to_cstrings<S: AsRef<[u8]>>(args: &[S]) -> Result<Vec<CString>> {
    args.iter()
        .map(|arg| {
            CString::new(arg.as_ref()).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid argument: {e}"),
            })
        })
        .collect()
}

/// Replace the current process image with `command`
///
/// The program is looked up in `PATH`. Standard streams, namespaces and
/// control group membership are inherited unchanged. Only returns on
/// failure.
///
/// # Errors
/// Returns [`Error::Exec`] if execvp(3) fails
pub fn exec_command(command: &TargetCommand) -> Result<Infallible> {
    let argv = command.argv();
    let argv = to_cstrings(&argv.iter().map(|a| a.as_bytes()).collect::<Vec<_>>())?;

    info!(
        program = %command.program().to_string_lossy(),
        args = ?command.args(),
        "Executing target command"
    );

    // argv[0] doubles as the program name
    nix::unistd::execvp(&argv[0], &argv).map_err(|errno| Error::Exec {
        program: command.program().to_string_lossy().into_owned(),
        errno,
    })
}
