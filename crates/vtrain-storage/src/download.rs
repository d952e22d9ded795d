//! Streaming HTTP download to a local file.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Stream the body of `GET url` into `dest`, returning the bytes written.
///
/// A partially written file is removed when the transfer fails.
pub async fn download_to_file(http: &Client, url: &str, dest: &Path) -> StorageResult<u64> {
    let response = http.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StorageError::download_failed(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        )));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let result = write_stream(response, dest).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(dest).await;
    }

    let written = result?;
    info!("Downloaded {} bytes to {}", written, dest.display());
    Ok(written)
}

async fn write_stream(response: reqwest::Response, dest: &Path) -> StorageResult<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    debug!("Stream finished after {} bytes", written);
    Ok(written)
}
