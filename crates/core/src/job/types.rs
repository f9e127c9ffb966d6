//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderCost;
use crate::storage::DurableRef;

/// Number of variations produced by a single generation request.
pub const VARIATIONS_PER_GROUP: usize = 3;

/// Canonical lifecycle state of a job.
///
/// Every provider vocabulary is mapped onto these four values. `Completed`
/// and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted to the provider, not yet picked up.
    Pending,
    /// Provider is rendering.
    Processing,
    /// Provider finished and reported an artifact.
    Completed,
    /// Provider gave up.
    Failed,
}

impl JobState {
    /// Returns the string representation used for storage and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Parse the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobState::Pending),
            "processing" => Some(JobState::Processing),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }

    /// Returns true if no transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Position in the lifecycle. Terminal states share the last stage.
    fn stage(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Processing => 1,
            JobState::Completed | JobState::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` is forward progress.
    ///
    /// Allowed: pending -> processing -> completed, and pending|processing -> failed.
    /// pending -> completed is allowed since providers may skip reporting
    /// the intermediate state between two polls.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        !self.is_terminal() && next.stage() > self.stage()
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider-side generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Unique job ID, assigned by the store.
    pub id: String,
    /// Sibling group this job belongs to.
    pub parent_id: String,
    /// Variation slot (0, 1 or 2), unique within the group.
    pub variation_index: u8,
    /// Requester that paid for this job.
    pub requester_id: String,
    /// The user's prompt before augmentation.
    pub prompt: String,
    /// Provider name the job was submitted to.
    pub provider: String,
    /// Opaque handle returned by the provider at submission.
    pub provider_task_id: String,
    /// Canonical lifecycle state.
    pub state: JobState,
    /// Provider-reported progress (0-100), advisory only.
    pub progress: u8,
    /// Ephemeral provider-hosted artifact URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    /// Provider-hosted preview image, when the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Failure reason reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Durable copy of the artifact. Set at most once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable_ref: Option<DurableRef>,
    /// Credits charged for this job at submission.
    pub cost_units: u32,
    /// Provider-reported cost estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_cost: Option<ProviderCost>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A completed job with a provider URL that has not been migrated yet.
    pub fn needs_migration(&self) -> bool {
        self.state == JobState::Completed
            && self.provider_url.is_some()
            && self.durable_ref.is_none()
    }
}

/// The three sibling jobs created from one generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobGroup {
    pub parent_id: String,
    pub requester_id: String,
    pub prompt: String,
    /// Sum of `cost_units` across the jobs.
    pub total_cost: u32,
    pub created_at: DateTime<Utc>,
    /// Jobs ordered by variation index.
    pub jobs: Vec<Job>,
}

impl JobGroup {
    /// Returns true once every job reached a terminal state and no
    /// completed job is still waiting for migration.
    pub fn is_settled(&self) -> bool {
        self.jobs
            .iter()
            .all(|job| job.state.is_terminal() && !job.needs_migration())
    }
}
