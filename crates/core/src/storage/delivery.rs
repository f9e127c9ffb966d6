//! Download link resolution for generated videos.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::job::{JobError, JobStore};

use super::ArtifactStorage;

/// Errors from download resolution.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No such job, or the job belongs to someone else.
    #[error("Video not found")]
    NotFound,

    /// Neither a durable copy nor a provider URL exists yet.
    #[error("Video not ready")]
    NotReady,

    #[error(transparent)]
    Job(#[from] JobError),
}

/// Where a requester can fetch a video from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DownloadLink {
    /// Time-limited URL into durable storage.
    Signed { url: String, expires_in: u64 },
    /// Raw provider URL; may expire on the provider's schedule.
    ProviderFallback { url: String },
}

impl DownloadLink {
    pub fn url(&self) -> &str {
        match self {
            DownloadLink::Signed { url, .. } | DownloadLink::ProviderFallback { url } => url,
        }
    }

    pub fn expires_in(&self) -> Option<u64> {
        match self {
            DownloadLink::Signed { expires_in, .. } => Some(*expires_in),
            DownloadLink::ProviderFallback { .. } => None,
        }
    }
}

/// Resolve a download link for `job_id` on behalf of `requester_id`.
///
/// Prefers a signed URL for the durable copy and falls back to the provider
/// URL when the job hasn't been migrated or signing fails.
pub async fn resolve_download(
    job_store: &dyn JobStore,
    storage: &dyn ArtifactStorage,
    job_id: &str,
    requester_id: &str,
    ttl_secs: u64,
) -> Result<DownloadLink, DeliveryError> {
    let job = job_store
        .get_job(job_id)?
        .filter(|job| job.requester_id == requester_id)
        .ok_or(DeliveryError::NotFound)?;

    if let Some(durable_ref) = &job.durable_ref {
        match storage.sign_download_url(durable_ref, ttl_secs).await {
            Ok(signed) => {
                return Ok(DownloadLink::Signed {
                    url: signed.url,
                    expires_in: signed.expires_in,
                })
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Signing failed, falling back to provider URL");
            }
        }
    }

    job.provider_url
        .map(|url| DownloadLink::ProviderFallback { url })
        .ok_or(DeliveryError::NotReady)
}
