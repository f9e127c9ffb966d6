//! Job storage trait and types.

use thiserror::Error;

use crate::job::{Job, JobGroup, JobState};
use crate::provider::ProviderCost;
use crate::storage::DurableRef;

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job or group not found.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Group request does not describe exactly one job per variation slot.
    #[error("Invalid job group: {0}")]
    InvalidGroup(String),

    /// Requested state change would move the job backwards or out of a terminal state.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobState,
        to: JobState,
    },

    /// Durable reference can't be recorded in the job's current state.
    #[error("Cannot record durable reference for job {job_id}: {reason}")]
    DurableRefRejected { job_id: String, reason: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// One job to be created as part of a group.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub variation_index: u8,
    pub provider: String,
    pub provider_task_id: String,
    pub cost_units: u32,
    pub provider_cost: Option<ProviderCost>,
}

/// Request to create a parent grouping and its jobs in one unit.
#[derive(Debug, Clone)]
pub struct CreateJobGroupRequest {
    pub requester_id: String,
    pub prompt: String,
    pub jobs: Vec<NewJob>,
}

impl CreateJobGroupRequest {
    /// Check that the jobs cover every variation slot exactly once.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.jobs.len() != crate::job::VARIATIONS_PER_GROUP {
            return Err(JobError::InvalidGroup(format!(
                "expected {} jobs, got {}",
                crate::job::VARIATIONS_PER_GROUP,
                self.jobs.len()
            )));
        }

        let mut seen = [false; crate::job::VARIATIONS_PER_GROUP];
        for job in &self.jobs {
            let idx = job.variation_index as usize;
            if idx >= seen.len() {
                return Err(JobError::InvalidGroup(format!(
                    "variation index {} out of range",
                    job.variation_index
                )));
            }
            if seen[idx] {
                return Err(JobError::InvalidGroup(format!(
                    "duplicate variation index {}",
                    job.variation_index
                )));
            }
            seen[idx] = true;
        }

        Ok(())
    }

    /// Sum of credits across the jobs.
    pub fn total_cost(&self) -> u32 {
        self.jobs.iter().map(|j| j.cost_units).sum()
    }
}

/// Status fields written by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub state: JobState,
    pub progress: u8,
    pub provider_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub failure_reason: Option<String>,
}

/// Trait for job storage backends.
pub trait JobStore: Send + Sync {
    /// Create the parent grouping and all of its jobs atomically.
    fn create_group(&self, request: CreateJobGroupRequest) -> Result<JobGroup, JobError>;

    /// Get a job by ID.
    fn get_job(&self, id: &str) -> Result<Option<Job>, JobError>;

    /// Get a group by parent ID, or the group containing the given job ID.
    fn get_group(&self, parent_or_job_id: &str) -> Result<Option<JobGroup>, JobError>;

    /// List a requester's groups, newest first.
    fn list_groups(
        &self,
        requester_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobGroup>, JobError>;

    /// Write reconciled status. Rejects transitions that are not forward progress.
    /// Writing the current state again only refreshes progress and URLs.
    fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<Job, JobError>;

    /// Atomically claim the right to migrate a job's artifact.
    /// Returns false if the job is already migrated or holds a live claim.
    /// Claims are leased: one left behind by a crashed worker expires and
    /// can be taken again.
    fn claim_migration(&self, id: &str) -> Result<bool, JobError>;

    /// Drop a migration claim after a failed ingest so a later poll can retry.
    fn release_migration(&self, id: &str) -> Result<(), JobError>;

    /// Record the durable reference. Never overwrites an existing one.
    fn set_durable_ref(&self, id: &str, durable_ref: &DurableRef) -> Result<Job, JobError>;
}
