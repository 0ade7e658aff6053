//! The external tools the verifier depends on.
//!
//! Registry inspection is done with skopeo, RPM database extraction with `oc image extract` and
//! package queries with rpm.  The [`RpmTools`] trait lets the rest of the crate stay agnostic of
//! how those are carried out; [`ExternalTools`] runs the real programs.

use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{cmd::run_cmd, error::CmdError};

/// Location of the RPM database inside a container image.
pub const RPMDB_PATH: &str = "/var/lib/rpm/";

/// Query format handed to `rpm -qa`: one line per package, NVR followed by the signature.
pub const RPM_QUERY_FORMAT: &str = "%{NAME}-%{VERSION}-%{RELEASE} %{SIGPGP:pgpsig}\n";

/// The operations the verifier needs from the outside world.
pub trait RpmTools: Send + Sync {
    /// Returns the raw manifest (or manifest list) for an image reference such as
    /// `docker://quay.io/foo/bar@sha256:...`.
    fn inspect_raw(&self, imgref: &str) -> impl Future<Output = Result<String, CmdError>> + Send;

    /// Copies the RPM database of `image` into `target_dir`, returning the database path.
    fn extract_rpmdb(
        &self,
        image: &str,
        target_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf, CmdError>> + Send;

    /// Lists every package in the database at `rpmdb`, one line per package, formatted as
    /// described by [`RPM_QUERY_FORMAT`].
    fn query_rpms(&self, rpmdb: &Path) -> impl Future<Output = Result<Vec<String>, CmdError>> + Send;
}

/// Arguments for `skopeo` to fetch the raw manifest of `imgref`.
pub fn inspect_args(imgref: &str) -> Vec<String> {
    vec!["inspect".into(), "--raw".into(), imgref.into()]
}

/// Arguments for `oc` to extract the RPM database of `image` into `target_dir`.
pub fn extract_args(image: &str, target_dir: &Path) -> Vec<String> {
    vec![
        "image".into(),
        "extract".into(),
        image.into(),
        "--path".into(),
        format!("{RPMDB_PATH}:{}", target_dir.display()),
    ]
}

/// Arguments for `rpm` to query all packages in the database at `rpmdb`.
pub fn query_args(rpmdb: &Path) -> Vec<String> {
    vec![
        "-qa".into(),
        "--qf".into(),
        RPM_QUERY_FORMAT.into(),
        "--dbpath".into(),
        rpmdb.display().to_string(),
    ]
}

/// [`RpmTools`] backed by the real skopeo, oc and rpm programs.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    pub skopeo: PathBuf,
    pub oc: PathBuf,
    pub rpm: PathBuf,
    /// Kill any single command that runs longer than this.  `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ExternalTools {
    fn default() -> Self {
        ExternalTools {
            skopeo: "skopeo".into(),
            oc: "oc".into(),
            rpm: "rpm".into(),
            timeout: None,
        }
    }
}

impl RpmTools for ExternalTools {
    async fn inspect_raw(&self, imgref: &str) -> Result<String, CmdError> {
        run_cmd(&self.skopeo, inspect_args(imgref), self.timeout).await
    }

    async fn extract_rpmdb(&self, image: &str, target_dir: &Path) -> Result<PathBuf, CmdError> {
        run_cmd(&self.oc, extract_args(image, target_dir), self.timeout).await?;
        Ok(target_dir.to_path_buf())
    }

    async fn query_rpms(&self, rpmdb: &Path) -> Result<Vec<String>, CmdError> {
        let stdout = run_cmd(&self.rpm, query_args(rpmdb), self.timeout).await?;
        Ok(stdout.lines().map(String::from).collect())
    }
}
