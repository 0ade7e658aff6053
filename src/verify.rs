//! A complete verification run: resolve, scan, report.

use std::{fmt, fs, sync::Arc};

use anyhow::{Context, Result};
use log::{error, info};

use crate::{
    config::Config,
    error::ResolveError,
    fanout::process_images,
    image::{ImageProcessor, ImageResults},
    report::{write_results, write_status, Report, Status},
    resolve::resolve_images,
    snapshot::parse_image_input,
    tools::RpmTools,
};

/// What to scan.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A pull-spec with tag plus the digest it currently points at.  Image indexes are expanded
    /// into their per-architecture images.
    Digest { image_url: String, image_digest: String },
    /// An image reference, or a snapshot document listing image references.  Used as given.
    Input(String),
}

impl ImageSource {
    pub async fn resolve(&self, tools: &impl RpmTools) -> Result<Vec<String>, ResolveError> {
        match self {
            ImageSource::Digest {
                image_url,
                image_digest,
            } => resolve_images(tools, image_url, image_digest).await,
            ImageSource::Input(input) => parse_image_input(input),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Digest {
                image_url,
                image_digest,
            } => write!(f, "{image_url}@{image_digest}"),
            ImageSource::Input(input) => f.write_str(input),
        }
    }
}

/// The outcome of a run, after the status and results files have been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    /// Human readable report for all images.
    pub output: String,
    pub aggregate: ImageResults,
    /// Whether the process should exit unsuccessfully.
    pub fail: bool,
}

/// Runs the whole pipeline for `source`.
///
/// Problems with individual images end up in the report.  If the images can't even be
/// determined, the report says so and the verdict always asks for failure.  Only trouble writing
/// the status or results files is returned as an error.
pub async fn verify<T>(config: &Config, tools: Arc<T>, source: &ImageSource) -> Result<Verdict>
where
    T: RpmTools + 'static,
{
    fs::create_dir_all(&config.workdir)
        .with_context(|| format!("Unable to create {}", config.workdir.display()))?;

    let images = match source.resolve(&*tools).await {
        Ok(images) => images,
        Err(err) => {
            error!("Unable to determine images for {source}: {err}");
            let aggregate = ImageResults::Error(err.to_string());
            write_status(&config.status_path, Status::Error)?;
            write_results(&config.results_path, &aggregate)?;
            return Ok(Verdict {
                status: Status::Error,
                output: format!("Unable to determine images for {source}:\n{err}\n"),
                aggregate,
                fail: true,
            });
        }
    };

    let processor = Arc::new(ImageProcessor::new(tools, &config.workdir));
    let processed = process_images(processor, images, config.jobs).await?;

    let report = Report::new(&processed);
    report.write(&config.status_path, &config.results_path)?;
    info!("Scanned {} image(s): {}", processed.len(), report.status);

    Ok(Verdict {
        fail: report.status == Status::Error && config.fail_unsigned,
        status: report.status,
        output: report.output,
        aggregate: report.aggregate,
    })
}
