//! Storage access for VTrain.
//!
//! Videos referenced by bucket and path are fetched by presigning a GET URL
//! and streaming the object over plain HTTP into the job's workspace.

pub mod client;
pub mod download;
pub mod error;
pub mod fetcher;

pub use client::{S3Storage, SignedUrlProvider, StorageConfig};
pub use download::download_to_file;
pub use error::{StorageError, StorageResult};
pub use fetcher::{StorageVideoFetcher, VideoFetcher, VideoSource};
