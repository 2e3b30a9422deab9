//! Process execution helpers.

use std::process::Command;

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

/// Execute a short-lived command and capture its output.
///
/// Meant for tools with small output (`git`); long builds go through the
/// supervised runner in `pct-maven`, which drains output while the process runs.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success` instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::debug!("running {program} {:?}", cmd.get_args().collect::<Vec<_>>());
    let output = cmd
        .output()
        .map_err(|source| UtilError::CommandExec { program, source })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}
