//! Scanning many images in parallel.
//!
//! One task is spawned per image, but no more than `jobs` of them run at once.  Results are
//! collected in input order no matter in which order the tasks finish, so the first failing
//! image is always the same one for a given input.

use std::{num::NonZeroUsize, sync::Arc};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use tokio::sync::Semaphore;

use crate::{
    image::{ImageProcessor, ProcessedImage},
    tools::RpmTools,
};

/// Scans every image in `images`, returning one record per image in the same order.
pub async fn process_images<T>(
    processor: Arc<ImageProcessor<T>>,
    images: Vec<String>,
    jobs: NonZeroUsize,
) -> Result<Vec<ProcessedImage>>
where
    T: RpmTools + 'static,
{
    info!("Scanning {} image(s), {jobs} at a time", images.len());

    let progress = ProgressBar::new(images.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let sem = Arc::new(Semaphore::new(jobs.get()));
    let mut entries = vec![];
    for image in images {
        let permit = Arc::clone(&sem).acquire_owned().await?;
        let processor = Arc::clone(&processor);
        let progress = progress.clone();
        let image_ = image.clone();
        let future = tokio::spawn(async move {
            let _permit = permit;
            let processed = processor.process(&image_).await;
            progress.inc(1);
            processed
        });
        entries.push((image, future));
    }

    let mut processed = Vec::with_capacity(entries.len());
    for (image, future) in entries {
        processed.push(match future.await {
            Ok(result) => result,
            Err(err) => {
                warn!("Scanning task for {image} did not complete: {err}");
                ProcessedImage::failed(image, format!("Scanning task did not complete: {err}"))
            }
        });
    }

    progress.finish_and_clear();
    Ok(processed)
}
