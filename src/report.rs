//! Merging per-image results into the final report.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};

use crate::image::{ImageResults, KeyCounts, ProcessedImage};

/// Terminates every image block in the combined output.
pub const SEPARATOR: &str = "====================================";

/// Overall verdict, written verbatim to the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ERROR` if any image failed or has unsigned packages, `SUCCESS` otherwise.
pub fn overall_status(images: &[ProcessedImage]) -> Status {
    let failing = images
        .iter()
        .any(|img| !img.error().is_empty() || !img.unsigned_rpms().is_empty());
    if failing {
        Status::Error
    } else {
        Status::Success
    }
}

/// Every image's output and results, each block followed by [`SEPARATOR`].
pub fn combined_output(images: &[ProcessedImage]) -> String {
    images
        .iter()
        .map(|img| format!("{}{}\n{SEPARATOR}\n", img.output(), img.results()))
        .collect()
}

/// Merges all images into one summary.
///
/// The first failed image (in input order) decides the report on its own.  Otherwise key counts
/// and unsigned counts are summed over all images.
pub fn aggregate(images: &[ProcessedImage]) -> ImageResults {
    if let Some(failed) = images.iter().find(|img| !img.error().is_empty()) {
        return ImageResults::Error(failed.error().to_string());
    }

    let keys = images.iter().flat_map(|img| img.signed_rpms_keys());
    let unsigned = images.iter().map(|img| img.unsigned_rpms().len()).sum();
    ImageResults::Keys(KeyCounts::tally(keys, unsigned))
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub status: Status,
    pub output: String,
    pub aggregate: ImageResults,
}

impl Report {
    pub fn new(images: &[ProcessedImage]) -> Self {
        Report {
            status: overall_status(images),
            output: combined_output(images),
            aggregate: aggregate(images),
        }
    }

    /// Writes the status token and the JSON aggregate to their files.
    pub fn write(&self, status_path: &Path, results_path: &Path) -> Result<()> {
        write_status(status_path, self.status)?;
        write_results(results_path, &self.aggregate)
    }
}

pub fn write_status(path: &Path, status: Status) -> Result<()> {
    fs::write(path, status.as_str())
        .with_context(|| format!("Unable to write status to {}", path.display()))
}

pub fn write_results(path: &Path, results: &ImageResults) -> Result<()> {
    let json = serde_json::to_string(results)?;
    fs::write(path, json).with_context(|| format!("Unable to write results to {}", path.display()))
}
