//! Streams finished artifacts from the generation backend to local disk.
//!
//! The body is written chunk by chunk to `{job_id}.{ext}.part` and renamed
//! to `{job_id}.{ext}` only once every byte is flushed, so the final name
//! exists only for complete files. The partial file is removed on any
//! error, and also when the download future is dropped (cancellation,
//! shutdown).

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use genesis_core::artifact::{artifact_path, extension_for_content_type};
use genesis_core::types::JobId;
use tokio::io::AsyncWriteExt;

/// Time allowed to establish the connection to the artifact host.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on a whole artifact transfer.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Errors from an artifact download. All of them fail the job.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download failed with HTTP status {0}")]
    Status(u16),

    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads artifacts into a fixed output root.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    output_dir: PathBuf,
}

impl ArtifactFetcher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self::with_client(client, output_dir)
    }

    pub fn with_client(client: reqwest::Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Download `url` to `{output_dir}/{job_id}.{ext}`, with the extension
    /// derived from `content_type`. Returns the final path.
    pub async fn fetch(
        &self,
        url: &str,
        job_id: JobId,
        content_type: &str,
    ) -> Result<PathBuf, FetchError> {
        let extension = extension_for_content_type(content_type);
        let final_path = artifact_path(&self.output_dir, job_id, &extension);
        let part = PartFile::new(final_path.with_extension(format!("{extension}.part")));

        tracing::info!(
            job_id = %job_id,
            url = %url,
            content_type = %content_type,
            path = %final_path.display(),
            "Downloading artifact",
        );

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(part.path()).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(part.path(), &final_path).await?;
        part.disarm();

        tracing::info!(job_id = %job_id, bytes = written, path = %final_path.display(), "Artifact saved");
        Ok(final_path)
    }
}

/// Removes the partial file on drop unless disarmed.
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial download");
                }
            }
        }
    }
}
