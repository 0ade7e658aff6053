//! Resolution of an image pull-spec and digest into single-architecture image references.
//!
//! The registry is asked for the raw manifest of `<repository>@<digest>`.  If that turns out to
//! be an image index (manifest list), every entry of the index is scanned; no filtering by
//! platform takes place.  Otherwise the image itself is the only reference.

use log::info;
use serde::Deserialize;

use crate::{error::ResolveError, tools::RpmTools};

/// The parts of an inspected manifest that matter here.
#[derive(Debug, Default, Deserialize)]
pub struct Inspection {
    /// Present only for image indexes.
    pub manifests: Option<Vec<ManifestEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub digest: String,
}

/// Strips the tag from a pull-spec: `quay.io/foo/bar:latest` becomes `quay.io/foo/bar`.
///
/// Only the text after the last `:` is removed, so registry ports survive.
pub fn repository(image_url: &str) -> &str {
    match image_url.rsplit_once(':') {
        Some((repo, _tag)) => repo,
        None => image_url,
    }
}

/// Fetches and parses the raw manifest for `image_url` pinned to `image_digest`.
pub async fn inspect_image_ref(
    tools: &impl RpmTools,
    image_url: &str,
    image_digest: &str,
) -> Result<Inspection, ResolveError> {
    let imgref = format!("docker://{}@{image_digest}", repository(image_url));
    let raw = tools.inspect_raw(&imgref).await?;
    serde_json::from_str(&raw).map_err(|source| ResolveError::Inspection { imgref, source })
}

/// Turns an inspection result into the list of image references to scan.
pub fn images_from_inspection(
    inspection: &Inspection,
    image_url: &str,
    image_digest: &str,
) -> Vec<String> {
    let repo = repository(image_url);
    match &inspection.manifests {
        Some(manifests) => manifests
            .iter()
            .map(|manifest| format!("{repo}@{}", manifest.digest))
            .collect(),
        None => vec![format!("{repo}@{image_digest}")],
    }
}

/// Inspects the image and returns every single-architecture reference it stands for.
pub async fn resolve_images(
    tools: &impl RpmTools,
    image_url: &str,
    image_digest: &str,
) -> Result<Vec<String>, ResolveError> {
    let inspection = inspect_image_ref(tools, image_url, image_digest).await?;
    let images = images_from_inspection(&inspection, image_url, image_digest);
    info!(
        "Resolved {image_url}@{image_digest} to {} image(s)",
        images.len()
    );
    Ok(images)
}
