//! Scanning a single image.
//!
//! [`ImageProcessor`] extracts the RPM database of one image into a private scratch directory,
//! classifies its packages and turns the outcome into a [`ProcessedImage`].  Tool failures stop
//! at this boundary: they become the `error` of that image and nothing else.

use std::{
    cmp::Reverse,
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use serde::{ser::SerializeMap, Serialize, Serializer};
use tempfile::TempDir;

use crate::{
    classify::{signed_rpms_keys, unsigned_rpms},
    error::CmdError,
    tools::RpmTools,
};

/// Prefix of the scratch directories created under the working directory.
pub const SCRATCH_PREFIX: &str = "rpmdb";

/// Number of packages signed by each key, plus the number of unsigned packages.
///
/// Keys are kept most frequent first, ties in the order they were first seen.  When serialized
/// the `unsigned` count follows the keys and replaces a key ID that happens to be `unsigned`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCounts {
    keys: Vec<(String, usize)>,
    unsigned: usize,
}

impl KeyCounts {
    pub fn tally<I, S>(keys: I, unsigned: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: Vec<(String, usize)> = vec![];
        let mut positions: HashMap<String, usize> = HashMap::new();
        for key in keys {
            let key = key.as_ref();
            match positions.get(key) {
                Some(&idx) => counts[idx].1 += 1,
                None => {
                    positions.insert(key.to_string(), counts.len());
                    counts.push((key.to_string(), 1));
                }
            }
        }
        // stable, so equal counts keep first-seen order
        counts.sort_by_key(|(_, count)| Reverse(*count));
        KeyCounts {
            keys: counts,
            unsigned,
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.keys
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, count)| *count)
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, usize)> {
        self.keys.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn unsigned(&self) -> usize {
        self.unsigned
    }
}

impl Serialize for KeyCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys: Vec<_> = self.keys.iter().filter(|(key, _)| key != "unsigned").collect();
        let mut map = serializer.serialize_map(Some(keys.len() + 1))?;
        for (key, count) in keys {
            map.serialize_entry(key, count)?;
        }
        map.serialize_entry("unsigned", &self.unsigned)?;
        map.end()
    }
}

/// Structured summary of a scan: `{"error": ...}` or `{"keys": {...}}`.
///
/// Used both for a single image and for the aggregate over all images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageResults {
    Error(String),
    Keys(KeyCounts),
}

impl fmt::Display for ImageResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Human readable summary of a single image.
pub fn image_output(image: &str, unsigned_rpms: &[String], error: &str) -> String {
    if !error.is_empty() {
        format!("Image: {image}\nError occurred:\n{error}\n")
    } else if !unsigned_rpms.is_empty() {
        format!("Image: {image}\nFound unsigned RPMs:\n{unsigned_rpms:?}\n")
    } else {
        format!("Image: {image}\nNo unsigned RPMs found\n")
    }
}

/// Structured summary of a single image.
pub fn image_results(
    error: &str,
    signed_rpms_keys: &[String],
    unsigned_rpms: &[String],
) -> ImageResults {
    if !error.is_empty() {
        ImageResults::Error(error.to_string())
    } else {
        ImageResults::Keys(KeyCounts::tally(signed_rpms_keys, unsigned_rpms.len()))
    }
}

/// The outcome of scanning one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    image: String,
    unsigned_rpms: Vec<String>,
    signed_rpms_keys: Vec<String>,
    error: String,
    output: String,
    results: ImageResults,
}

impl ProcessedImage {
    /// Builds the record for a scanned image, deriving its output and results.
    pub fn new(
        image: impl Into<String>,
        unsigned_rpms: Vec<String>,
        signed_rpms_keys: Vec<String>,
    ) -> Self {
        Self::build(image.into(), unsigned_rpms, signed_rpms_keys, String::new())
    }

    /// Builds the record for an image whose scan failed.  A failed image has no packages.
    pub fn failed(image: impl Into<String>, error: impl Into<String>) -> Self {
        Self::build(image.into(), vec![], vec![], error.into())
    }

    fn build(
        image: String,
        unsigned_rpms: Vec<String>,
        signed_rpms_keys: Vec<String>,
        error: String,
    ) -> Self {
        let output = image_output(&image, &unsigned_rpms, &error);
        let results = image_results(&error, &signed_rpms_keys, &unsigned_rpms);
        ProcessedImage {
            image,
            unsigned_rpms,
            signed_rpms_keys,
            error,
            output,
            results,
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn unsigned_rpms(&self) -> &[String] {
        &self.unsigned_rpms
    }

    pub fn signed_rpms_keys(&self) -> &[String] {
        &self.signed_rpms_keys
    }

    /// Empty unless the scan failed.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn results(&self) -> &ImageResults {
        &self.results
    }
}

/// Scans images one at a time, each in its own scratch directory below `workdir`.
#[derive(Debug)]
pub struct ImageProcessor<T> {
    tools: Arc<T>,
    workdir: PathBuf,
}

impl<T: RpmTools> ImageProcessor<T> {
    pub fn new(tools: Arc<T>, workdir: impl Into<PathBuf>) -> Self {
        ImageProcessor {
            tools,
            workdir: workdir.into(),
        }
    }

    /// Scans `image`.  Never fails: problems are recorded in the returned record.
    pub async fn process(&self, image: &str) -> ProcessedImage {
        let scratch = match TempDir::with_prefix_in(SCRATCH_PREFIX, &self.workdir) {
            Ok(scratch) => scratch,
            Err(err) => {
                let error = format!(
                    "Unable to create scratch directory in {}: {err}",
                    self.workdir.display()
                );
                warn!("{image}: {error}");
                return ProcessedImage::failed(image, error);
            }
        };
        debug!("Scanning {image} in {}", scratch.path().display());

        let processed = match self.scan(image, scratch.path()).await {
            Ok((unsigned, keys)) => ProcessedImage::new(image, unsigned, keys),
            Err(err) => {
                warn!("Scanning {image} failed: {err}");
                ProcessedImage::failed(image, err.diagnostic())
            }
        };

        let path = scratch.path().to_path_buf();
        if let Err(err) = scratch.close() {
            warn!("Unable to remove {}: {err}", path.display());
        }
        processed
    }

    async fn scan(
        &self,
        image: &str,
        scratch: &Path,
    ) -> Result<(Vec<String>, Vec<String>), CmdError> {
        let rpmdb = self.tools.extract_rpmdb(image, scratch).await?;
        let rpms = self.tools.query_rpms(&rpmdb).await?;
        Ok((unsigned_rpms(&rpms), signed_rpms_keys(&rpms)))
    }
}
