//! Error types for verify-rpms.
//!
//! Two families of errors exist:
//!
//! - [`CmdError`]: an external tool (skopeo, oc, rpm) could not be run or exited unsuccessfully.
//!   Once images are being processed these are converted into per-image data and never abort the
//!   run.
//! - [`ResolveError`]: the list of images to scan could not be determined.  This is fatal for the
//!   whole run.

use std::time::Duration;

/// Failure to run an external command.
#[derive(Debug, thiserror::Error)]
pub enum CmdError {
    /// The command ran and exited with a non-zero status.
    #[error("Running {command} failed\n{stderr}")]
    Failed { command: String, stderr: String },

    /// The command could not be started at all.
    #[error("Running {command} failed\n{source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command did not finish within the configured timeout and was killed.
    #[error("Running {command} failed\ntimed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

impl CmdError {
    /// The diagnostic text reported for a failed image.
    ///
    /// For a command that exited unsuccessfully this is exactly what the tool wrote to stderr, or
    /// the full message if it wrote nothing.  Never empty.
    pub fn diagnostic(&self) -> String {
        match self {
            CmdError::Failed { stderr, .. } if !stderr.trim().is_empty() => stderr.clone(),
            other => other.to_string(),
        }
    }
}

/// Failure to determine which images to scan.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Inspect(#[from] CmdError),

    /// The registry inspection output was not valid JSON.
    #[error("Unable to parse inspection of {imgref}: {source}")]
    Inspection {
        imgref: String,
        #[source]
        source: serde_json::Error,
    },

    /// The input was JSON but not a snapshot document.
    #[error("Unable to parse snapshot input: {0}")]
    Snapshot(#[source] serde_json::Error),
}
