//! Run configuration.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread::available_parallelism,
};

/// Where to work and where to put the results.
#[derive(Debug, Clone)]
pub struct Config {
    /// Parent of the per-image scratch directories.
    pub workdir: PathBuf,
    pub status_path: PathBuf,
    pub results_path: PathBuf,
    /// Request a failing exit when the status is `ERROR`.
    pub fail_unsigned: bool,
    /// Upper bound on images scanned at the same time.
    pub jobs: NonZeroUsize,
}

impl Config {
    /// Status and results go to `status` and `results` inside `workdir`; as many images are
    /// scanned at once as the host has CPUs.
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        let workdir = workdir.as_ref();
        Config {
            workdir: workdir.to_path_buf(),
            status_path: workdir.join("status"),
            results_path: workdir.join("results"),
            fail_unsigned: false,
            jobs: default_jobs(),
        }
    }
}

/// The number of CPUs available to us, or 1 if that can't be determined.
pub fn default_jobs() -> NonZeroUsize {
    available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
