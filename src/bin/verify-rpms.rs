//! Command-line front end for verify-rpms.
//!
//! Scans an image, or every image of a multi-architecture index, for unsigned RPMs.  A status
//! token (`SUCCESS`/`ERROR`) and a JSON summary of the signing keys are written to files for the
//! calling pipeline; the human readable report goes to stdout.

use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{ArgAction, Parser};

use verify_rpms::{
    config::{default_jobs, Config},
    tools::ExternalTools,
    verify::{verify, ImageSource},
};

/// verify-rpms
#[derive(Debug, Parser)]
#[clap(name = "verify-rpms", version)]
pub struct App {
    /// Image pull-spec including its tag, e.g. quay.io/foo/bar:latest
    #[clap(long, requires = "image_digest", conflicts_with = "input")]
    image_url: Option<String>,
    /// Digest the image tag points at, e.g. sha256:...
    #[clap(long, requires = "image_url")]
    image_digest: Option<String>,
    /// An image reference or a snapshot JSON document; images are scanned as given
    #[clap(long, required_unless_present = "image_url")]
    input: Option<String>,

    /// Exit with failure if unsigned RPMs or other errors were found
    #[clap(long, action = ArgAction::Set, required = true)]
    fail_unsigned: bool,
    /// Path in which temporary directories will be created
    #[clap(long)]
    workdir: PathBuf,
    /// Where to write SUCCESS or ERROR [default: <workdir>/status]
    #[clap(long)]
    status_path: Option<PathBuf>,
    /// Where to write the JSON results [default: <workdir>/results]
    #[clap(long)]
    results_path: Option<PathBuf>,
    /// Number of images to scan at the same time [default: number of CPUs]
    #[clap(long)]
    jobs: Option<NonZeroUsize>,
    /// Kill any external command running longer than this many seconds
    #[clap(long)]
    command_timeout: Option<u64>,

    /// skopeo program to use
    #[clap(long, default_value = "skopeo")]
    skopeo: PathBuf,
    /// oc program to use
    #[clap(long, default_value = "oc")]
    oc: PathBuf,
    /// rpm program to use
    #[clap(long, default_value = "rpm")]
    rpm: PathBuf,
}

impl App {
    fn source(&self) -> ImageSource {
        match (&self.image_url, &self.image_digest, &self.input) {
            (Some(image_url), Some(image_digest), _) => ImageSource::Digest {
                image_url: image_url.clone(),
                image_digest: image_digest.clone(),
            },
            // clap guarantees one of the two forms
            (_, _, input) => ImageSource::Input(input.clone().unwrap_or_default()),
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::new(&self.workdir);
        if let Some(path) = &self.status_path {
            config.status_path = path.clone();
        }
        if let Some(path) = &self.results_path {
            config.results_path = path.clone();
        }
        config.fail_unsigned = self.fail_unsigned;
        config.jobs = self.jobs.unwrap_or_else(default_jobs);
        config
    }

    fn tools(&self) -> ExternalTools {
        ExternalTools {
            skopeo: self.skopeo.clone(),
            oc: self.oc.clone(),
            rpm: self.rpm.clone(),
            timeout: self.command_timeout.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = App::parse();

    let verdict = verify(&args.config(), Arc::new(args.tools()), &args.source()).await?;

    print!("{}", verdict.output);
    println!("{}", verdict.aggregate);

    if verdict.fail {
        eprint!("{}", verdict.output);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
