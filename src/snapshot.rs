//! Image lists given as a snapshot document.
//!
//! A snapshot names the container images of an application release:
//!
//! ```json
//! {"components": [{"containerImage": "quay.io/foo/bar@sha256:..."}]}
//! ```

use serde::Deserialize;

use crate::error::ResolveError;

#[derive(Debug, Deserialize)]
pub struct Component {
    #[serde(rename = "containerImage")]
    pub container_image: String,
}

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    pub components: Vec<Component>,
}

/// Returns the images named by `input`.
///
/// `input` is either a snapshot document or, if it doesn't parse as JSON at all, a single image
/// reference.
pub fn parse_image_input(input: &str) -> Result<Vec<String>, ResolveError> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(input) else {
        return Ok(vec![input.to_string()]);
    };
    let snapshot = Snapshot::deserialize(value).map_err(ResolveError::Snapshot)?;
    Ok(snapshot
        .components
        .into_iter()
        .map(|component| component.container_image)
        .collect())
}
