use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SlideshowError};
use crate::slideshow::transition::LoadReporter;

/// Check that `address` points at a decodable image and return its dimensions.
///
/// Only the header is read; decoding runs on the blocking pool.
pub async fn probe(address: &str) -> Result<(u32, u32)> {
    let path = PathBuf::from(address);
    let failed = |reason: String| SlideshowError::LoadFailed {
        address: address.to_string(),
        reason,
    };
    tokio::task::spawn_blocking(move || read_dimensions(&path))
        .await
        .map_err(|err| failed(err.to_string()))?
        .map_err(|err| failed(format!("{err:#}")))
}

fn read_dimensions(path: &Path) -> anyhow::Result<(u32, u32)> {
    let dimensions = image::ImageReader::open(path)?
        .with_guessed_format()? // sniff based on content/extension
        .into_dimensions()?;
    Ok(dimensions)
}

/// Probe in the background and report the result for `reporter`'s transition.
pub fn spawn_probe(address: String, reporter: LoadReporter) {
    tokio::spawn(async move {
        match probe(&address).await {
            Ok((width, height)) => {
                debug!(address, width, height, ticket = reporter.ticket(), "image loaded");
                reporter.loaded();
            }
            Err(err) => reporter.failed(err.to_string()),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_reads_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();
        let dims = probe(&path.display().to_string()).await.unwrap();
        assert_eq!(dims, (3, 2));
    }

    #[tokio::test]
    async fn probe_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let err = probe(&path.display().to_string()).await.unwrap_err();
        assert!(matches!(err, SlideshowError::LoadFailed { .. }));
    }
}
