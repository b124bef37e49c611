//! Shell command execution with per-stream file redirection.

use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Executes `command` through the platform shell, with stdout/stderr/stdin
/// redirected to or from the given files, or to the null device where no
/// file is provided.
///
/// A nonzero exit is reported through the returned status, not as an error;
/// `Err` means the command could not be spawned or waited on at all.
pub fn system_command(
    command: &str,
    stdout_file: Option<&Path>,
    stderr_file: Option<&Path>,
    stdin_file: Option<&Path>,
) -> Result<ExitStatus, Error> {
    log::debug!("running shell command: {}", command);

    shell(command)
        .stdout(write_redirect(stdout_file)?)
        .stderr(write_redirect(stderr_file)?)
        .stdin(read_redirect(stdin_file)?)
        .status()
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("/bin/sh");
    shell.arg("-c").arg(command);
    shell
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C").arg(command);
    shell
}

fn write_redirect(path: Option<&Path>) -> Result<Stdio, Error> {
    match path {
        Some(path) => Ok(Stdio::from(File::create(path)?)),
        None => Ok(Stdio::null()),
    }
}

fn read_redirect(path: Option<&Path>) -> Result<Stdio, Error> {
    match path {
        Some(path) => Ok(Stdio::from(File::open(path)?)),
        None => Ok(Stdio::null()),
    }
}
