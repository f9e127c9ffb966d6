//! Types for durable artifact storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Fetching the artifact from its source URL failed.
    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signed URL could not be produced.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Storage could not be constructed from its configuration.
    #[error("Storage misconfigured: {0}")]
    Configuration(String),
}

/// Stable pointer to an artifact in durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableRef {
    /// Storage key, e.g. `videos/{owner}/{job}.mp4`.
    pub key: String,
    /// Unsigned public location of the artifact.
    pub url: String,
}

/// Time-limited access URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_in: u64,
}

/// Durable storage collaborator used by migration and download resolution.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Copy the artifact at `url` into durable storage, namespaced by owner and job.
    async fn ingest_from_url(
        &self,
        url: &str,
        owner_id: &str,
        job_id: &str,
    ) -> Result<DurableRef, StorageError>;

    /// Produce a URL granting access to the artifact for `ttl_secs`.
    async fn sign_download_url(
        &self,
        durable_ref: &DurableRef,
        ttl_secs: u64,
    ) -> Result<SignedUrl, StorageError>;
}
