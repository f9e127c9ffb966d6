//! Migration of completed artifacts into durable storage.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::job::{Job, JobError, JobState, JobStore};
use crate::metrics;
use crate::storage::{ArtifactStorage, StorageError};

/// Errors from a migration attempt.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Job isn't completed or has no provider URL.
    #[error("job {job_id} is not eligible for migration: {reason}")]
    NotEligible { job_id: String, reason: String },

    /// Claim or durable reference write failed.
    #[error("job store error: {0}")]
    Store(#[from] JobError),

    /// Ingest into durable storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of a migration attempt.
#[derive(Debug)]
pub enum MigrationResult {
    /// Artifact stored; the returned job carries the durable reference.
    Migrated(Job),
    /// Someone else holds the claim or already migrated the job. No storage call was made.
    AlreadyClaimed,
}

/// Copies a completed job's artifact into durable storage, at most once per job.
///
/// Exclusivity comes from the store's atomic claim, not from any in-process lock.
#[derive(Clone)]
pub struct MigrationTrigger {
    job_store: Arc<dyn JobStore>,
    storage: Arc<dyn ArtifactStorage>,
}

impl MigrationTrigger {
    pub fn new(job_store: Arc<dyn JobStore>, storage: Arc<dyn ArtifactStorage>) -> Self {
        Self { job_store, storage }
    }

    /// Migrate a completed job's artifact.
    ///
    /// On ingest failure the claim is released and the provider URL stays
    /// on the job as the fallback access path.
    pub async fn migrate(&self, job: &Job) -> Result<MigrationResult, MigrationError> {
        if job.state != JobState::Completed {
            return Err(MigrationError::NotEligible {
                job_id: job.id.clone(),
                reason: format!("job is {}", job.state),
            });
        }
        let Some(url) = job.provider_url.as_deref() else {
            return Err(MigrationError::NotEligible {
                job_id: job.id.clone(),
                reason: "no provider URL".to_string(),
            });
        };
        if job.durable_ref.is_some() {
            return Ok(MigrationResult::AlreadyClaimed);
        }

        if !self.job_store.claim_migration(&job.id)? {
            debug!(job_id = %job.id, "Migration already claimed");
            metrics::MIGRATIONS_TOTAL
                .with_label_values(&["already_claimed"])
                .inc();
            return Ok(MigrationResult::AlreadyClaimed);
        }

        let durable_ref = match self
            .storage
            .ingest_from_url(url, &job.requester_id, &job.id)
            .await
        {
            Ok(durable_ref) => durable_ref,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Artifact ingest failed, keeping provider URL");
                self.release(&job.id);
                metrics::MIGRATIONS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(MigrationError::Storage(e));
            }
        };

        match self.job_store.set_durable_ref(&job.id, &durable_ref) {
            Ok(updated) => {
                info!(job_id = %job.id, key = %durable_ref.key, "Artifact migrated");
                metrics::MIGRATIONS_TOTAL.with_label_values(&["success"]).inc();
                Ok(MigrationResult::Migrated(updated))
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to record durable reference");
                self.release(&job.id);
                metrics::MIGRATIONS_TOTAL.with_label_values(&["failed"]).inc();
                Err(MigrationError::Store(e))
            }
        }
    }

    fn release(&self, job_id: &str) {
        if let Err(e) = self.job_store.release_migration(job_id) {
            error!(job_id, error = %e, "Failed to release migration claim");
        }
    }
}
