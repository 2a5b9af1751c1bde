pub mod ffmpeg;

use anyhow::{Context, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::retry::RetryPolicy;

/// Stable file stem for a remote asset.
pub fn url_digest(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Streams `url` into `destination`. A partially written file is removed
/// before the error is returned.
pub async fn download_to_file(
    http: &reqwest::Client,
    retry: &RetryPolicy,
    url: &str,
    destination: &Path,
) -> Result<u64> {
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let result = retry
        .run("asset download", || async {
            let response = http.get(url).send().await?.error_for_status()?;
            let mut file = tokio::fs::File::create(destination).await?;
            let mut stream = response.bytes_stream();
            let mut written = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            if written == 0 {
                anyhow::bail!("empty response body");
            }
            Ok(written)
        })
        .await
        .with_context(|| format!("Failed to download {}", url));

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(destination).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %destination.display(), error = %e, "failed to remove partial download");
            }
        }
    }
    result
}
