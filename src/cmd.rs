//! Running external programs.

use std::{ffi::OsStr, process::Stdio, time::Duration};

use log::debug;
use tokio::process::Command;

use crate::error::CmdError;

/// Runs `program` with `args`, capturing its output.
///
/// Returns the standard output on success.  A non-zero exit status produces
/// [`CmdError::Failed`] carrying whatever the program wrote to stderr.  If `timeout` is given and
/// elapses first, the child is killed and [`CmdError::TimedOut`] is returned.
pub async fn run_cmd<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    timeout: Option<Duration>,
) -> Result<String, CmdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program.as_ref());
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let command = describe(&cmd);
    debug!("Running {command}");

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(output) => output,
            Err(_) => {
                return Err(CmdError::TimedOut {
                    command,
                    timeout: limit,
                })
            }
        },
        None => cmd.output().await,
    };

    let output = output.map_err(|source| CmdError::Spawn {
        command: command.clone(),
        source,
    })?;

    if !output.status.success() {
        debug!("{command} exited with {}", output.status);
        return Err(CmdError::Failed {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Formats the full argument vector of a command, program included, e.g. `["rpm", "-qa"]`.
fn describe(cmd: &Command) -> String {
    let cmd = cmd.as_std();
    let argv: Vec<_> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| arg.to_string_lossy())
        .collect();
    format!("{argv:?}")
}
