//! Types for status reconciliation.

use thiserror::Error;

use crate::job::{Job, JobError, JobState};
use crate::provider::ProviderError;

use super::MigrationError;

/// Per-job reconciliation failure. The job's stored state is left as it was.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Job references a provider that isn't registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Status query failed.
    #[error("status query failed: {0}")]
    Provider(#[from] ProviderError),

    /// Writing the new status failed.
    #[error("job store error: {0}")]
    Store(#[from] JobError),

    /// Job or group not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The refresh task for this job did not complete.
    #[error("refresh task failed: {0}")]
    TaskFailed(String),
}

/// What a refresh did to one job.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Job was already terminal; the provider was not queried.
    Skipped,
    /// Nothing to persist (same state and progress, or a regression that was ignored).
    Unchanged,
    /// Same state, new progress or URLs.
    ProgressUpdated { progress: u8 },
    /// Forward state change.
    Transitioned { from: JobState, to: JobState },
    /// Provider reported a state with no canonical mapping; job left unchanged.
    UnknownState { reported: String },
    /// Query or store failed; job left unchanged.
    Failed(ReconcileError),
}

impl RefreshOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RefreshOutcome::Failed(_))
    }
}

/// Migration attempt made during a refresh.
#[derive(Debug)]
pub enum MigrationStatus {
    /// Durable reference recorded.
    Migrated,
    /// Another refresh holds or already completed the migration.
    AlreadyClaimed,
    /// Migration failed; the provider URL stays as the fallback.
    Failed(MigrationError),
}

/// Result of refreshing one job.
#[derive(Debug)]
pub struct JobRefresh {
    /// The job as it stands after the refresh.
    pub job: Job,
    pub outcome: RefreshOutcome,
    /// Set when a migration was attempted.
    pub migration: Option<MigrationStatus>,
}

impl JobRefresh {
    pub(crate) fn new(job: Job, outcome: RefreshOutcome) -> Self {
        Self {
            job,
            outcome,
            migration: None,
        }
    }

    pub fn migrated(&self) -> bool {
        matches!(self.migration, Some(MigrationStatus::Migrated))
    }

    pub fn migration_error(&self) -> Option<&MigrationError> {
        match &self.migration {
            Some(MigrationStatus::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// Query, store or migration error for this job, as a display string.
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            RefreshOutcome::Failed(e) => Some(e.to_string()),
            _ => self.migration_error().map(|e| e.to_string()),
        }
    }
}

/// Result of a refresh call, one entry per input job in input order.
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub jobs: Vec<JobRefresh>,
}

impl RefreshReport {
    /// Updated jobs in input order.
    pub fn jobs(&self) -> Vec<&Job> {
        self.jobs.iter().map(|r| &r.job).collect()
    }

    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs.into_iter().map(|r| r.job).collect()
    }

    /// Per-job error messages keyed by job id.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.jobs
            .iter()
            .filter_map(|r| r.error_message().map(|msg| (r.job.id.clone(), msg)))
            .collect()
    }

    /// Number of jobs migrated during this refresh.
    pub fn migrations(&self) -> usize {
        self.jobs.iter().filter(|r| r.migrated()).count()
    }

    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(|r| r.job.state.is_terminal())
    }
}
