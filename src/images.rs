// =============================================================================
// images.rs - THE IMAGE FETCHER
// =============================================================================
//
// Every card page points at one card image. We stream it straight into
// `<image_dir>/<original filename>`, chunk by chunk, and only report success
// once the file is flushed. Same filename twice means the second one wins.
//
// If anything breaks halfway, the half-written file goes away. A truncated
// PNG that looks like a real one is worse than no file at all.
// =============================================================================

use std::fmt::Display;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::ImageWriteError;
use crate::models::ImageAsset;

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Anything that can take an image asset and put it somewhere.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, asset: &ImageAsset) -> Result<StoredImage, ImageWriteError>;
}

/// Downloads images over HTTP into a local directory.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    image_dir: PathBuf,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client, image_dir: impl Into<PathBuf>) -> Self {
        Self { client, image_dir: image_dir.into() }
    }
}

#[async_trait]
impl ImageStore for HttpImageFetcher {
    async fn store(&self, asset: &ImageAsset) -> Result<StoredImage, ImageWriteError> {
        let url = asset.url.to_string();
        let response = self
            .client
            .get(asset.url.clone())
            .send()
            .await
            .map_err(|source| ImageWriteError::Retrieve { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageWriteError::Status { url, status: status.as_u16() });
        }

        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .map_err(|source| ImageWriteError::Io { path: self.image_dir.clone(), source })?;

        let path = self.image_dir.join(&asset.filename);
        let bytes = write_stream(response.bytes_stream(), &path).await?;

        debug!(url = %url, path = %path.display(), bytes, "Card image stored");
        Ok(StoredImage { path, bytes })
    }
}

/// Copy a byte stream into `path`, truncating any existing file. Returns the
/// number of bytes written. On any error the partial file is removed.
pub async fn write_stream<S, B, E>(stream: S, path: &Path) -> Result<u64, ImageWriteError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    match copy_stream(stream, path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Could not remove partial image");
                }
            }
            Err(err)
        }
    }
}

async fn copy_stream<S, B, E>(stream: S, path: &Path) -> Result<u64, ImageWriteError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let io_err = |source| ImageWriteError::Io { path: path.to_path_buf(), source };

    let mut file = tokio::fs::File::create(path).await.map_err(io_err)?;
    let mut written = 0u64;

    futures::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ImageWriteError::Stream {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_err)?;
    Ok(written)
}
