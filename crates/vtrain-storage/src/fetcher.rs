//! Fetching a referenced video into a local path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::client::{SignedUrlProvider, StorageConfig};
use crate::download::download_to_file;
use crate::error::StorageResult;

/// Location of a video in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSource {
    pub bucket: String,
    pub path: String,
}

impl VideoSource {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
        }
    }

    /// File extension of the object path including the dot, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{}", e))
    }
}

/// Copies a stored video to a local file.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch(&self, source: &VideoSource, dest: &Path) -> StorageResult<u64>;
}

/// [`VideoFetcher`] that presigns a GET URL and downloads it over HTTP.
pub struct StorageVideoFetcher {
    signer: Arc<dyn SignedUrlProvider>,
    http: Client,
    signed_url_ttl: Duration,
}

impl StorageVideoFetcher {
    pub fn new(
        signer: Arc<dyn SignedUrlProvider>,
        signed_url_ttl: Duration,
        download_timeout: Duration,
    ) -> StorageResult<Self> {
        let http = Client::builder().timeout(download_timeout).build()?;
        Ok(Self {
            signer,
            http,
            signed_url_ttl,
        })
    }

    pub fn from_config(signer: Arc<dyn SignedUrlProvider>, config: &StorageConfig) -> StorageResult<Self> {
        Self::new(signer, config.signed_url_ttl, config.download_timeout)
    }
}

#[async_trait]
impl VideoFetcher for StorageVideoFetcher {
    async fn fetch(&self, source: &VideoSource, dest: &Path) -> StorageResult<u64> {
        let url = self
            .signer
            .signed_url(&source.bucket, &source.path, self.signed_url_ttl)
            .await?;

        info!("Fetching {}/{} into {}", source.bucket, source.path, dest.display());
        download_to_file(&self.http, &url, dest).await
    }
}
