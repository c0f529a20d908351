use std::path::Path;

use async_trait::async_trait;
use camino::Utf8Path;
use image::{DynamicImage, ImageReader};
use reqwest::{Client, StatusCode};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use super::error::{FetchError, Stage, ThumbnailError};
use crate::utils::drain_into;

/// HTTP fetch capability.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// A downloaded source image parked in the scratch directory. The file is
/// deleted when this is dropped, whatever happened in between.
#[derive(Debug)]
pub struct ScratchImage {
    file: NamedTempFile,
}

impl ScratchImage {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn decode(&self) -> Result<DynamicImage, ThumbnailError> {
        ImageReader::open(self.path())
            .map_err(|err| ThumbnailError::render(Stage::Decode, err))?
            .with_guessed_format()
            .map_err(|err| ThumbnailError::render(Stage::Decode, err))?
            .decode()
            .map_err(|err| ThumbnailError::render(Stage::Decode, err))
    }
}

/// Downloads `url` into a fresh file under `scratch_dir`. Nothing touches the
/// disk unless the download itself succeeded.
#[instrument(skip(fetcher, scratch_dir))]
pub async fn download_source<F>(
    fetcher: &F,
    url: &str,
    scratch_dir: &Utf8Path,
    video_id: &str,
) -> Result<ScratchImage, ThumbnailError>
where
    F: ImageFetcher + ?Sized,
{
    let bytes = fetcher
        .fetch(url)
        .await
        .map_err(|err| ThumbnailError::fetch(Stage::Download, err))?;
    debug!(len = bytes.len(), "downloaded source image");

    let park = |err: std::io::Error| ThumbnailError::fetch(Stage::Download, err);
    tokio::fs::create_dir_all(scratch_dir).await.map_err(park)?;
    let file = tempfile::Builder::new()
        .prefix(&format!("thumb_{video_id}_"))
        .tempfile_in(scratch_dir)
        .map_err(park)?;
    let writer = tokio::fs::File::from_std(file.reopen().map_err(park)?);
    drain_into(bytes.as_slice(), writer)
        .await
        .map_err(|err| ThumbnailError::fetch(Stage::Download, err))?;

    Ok(ScratchImage { file })
}
