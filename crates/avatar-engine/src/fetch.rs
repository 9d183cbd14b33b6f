//! Artifact download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use pitchcast_match_model::is_synthetic_locator;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

/// Download chunk buffer size in bytes.
pub const CHUNK_SIZE: usize = 8192;

/// Materialize a finished job's content locator as a local file.
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Write the content behind `locator` to `file_name` and return its path.
    async fn fetch(&self, locator: &str, file_name: &str) -> Result<PathBuf, FetchError>;
}

/// Fetcher that streams real locators over HTTP and writes placeholder
/// files for synthetic ones.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    http: reqwest::Client,
    output_dir: PathBuf,
}

impl HttpArtifactFetcher {
    /// Create a fetcher writing into `output_dir`, creating it if needed.
    pub fn new(output_dir: impl AsRef<Path>, timeout: Duration) -> Result<Self, FetchError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| FetchError::Io {
            path: output_dir.clone(),
            source: e,
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write_placeholder(&self, locator: &str, path: &Path) -> Result<(), FetchError> {
        tokio::fs::write(path, format!("Mock video placeholder: {locator}"))
            .await
            .map_err(|e| FetchError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    async fn download(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let response = self.http.get(url).send().await?.error_for_status()?;

        let io_err = |e| FetchError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let file = tokio::fs::File::create(path).await.map_err(io_err)?;
        let mut writer = tokio::io::BufWriter::with_capacity(CHUNK_SIZE, file);

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(io_err)?;
        Ok(written)
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, locator: &str, file_name: &str) -> Result<PathBuf, FetchError> {
        let path = self.output_dir.join(file_name);

        if is_synthetic_locator(locator) {
            self.write_placeholder(locator, &path).await?;
            tracing::debug!(locator, path = %path.display(), "Wrote placeholder clip");
            return Ok(path);
        }

        match self.download(locator, &path).await {
            Ok(bytes) => {
                tracing::info!(bytes, path = %path.display(), "Downloaded clip");
                Ok(path)
            }
            Err(e) => {
                // Never leave a truncated clip behind.
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}
