//! Testing utilities and mock implementations.
//!
//! Mocks for the provider and storage traits, so the orchestrator,
//! reconciler and HTTP layer can be exercised without real services.
//!
//! # Example
//!
//! ```rust,ignore
//! use triptych_core::testing::{MockProvider, MockStorage};
//!
//! let luma = Arc::new(MockProvider::new("luma"));
//! let storage = Arc::new(MockStorage::new());
//!
//! // Script provider responses
//! luma.set_state("luma-task-1", JobState::Processing, 40).await;
//! ```

mod mock_provider;
mod mock_storage;

pub use mock_provider::{MockProvider, RecordedSubmission};
pub use mock_storage::{MockStorage, RecordedIngest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::job::{CreateJobGroupRequest, Job, JobState, NewJob};

    /// A pending job with reasonable defaults, not persisted anywhere.
    pub fn job(id: &str, parent_id: &str, variation_index: u8, provider: &str) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            variation_index,
            requester_id: "user-1".to_string(),
            prompt: "A lighthouse at dusk".to_string(),
            provider: provider.to_string(),
            provider_task_id: format!("{}-task-{}", provider, variation_index),
            state: JobState::Pending,
            progress: 0,
            provider_url: None,
            thumbnail_url: None,
            failure_reason: None,
            durable_ref: None,
            cost_units: 10,
            provider_cost: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A valid three-job group request (luma, runway, luma) with task ids `task-0..2`.
    pub fn group_request(requester_id: &str) -> CreateJobGroupRequest {
        group_request_with_tasks(requester_id, ["task-0", "task-1", "task-2"])
    }

    /// Same as [`group_request`] with explicit provider task ids.
    pub fn group_request_with_tasks(
        requester_id: &str,
        task_ids: [&str; 3],
    ) -> CreateJobGroupRequest {
        let providers = ["luma", "runway", "luma"];
        CreateJobGroupRequest {
            requester_id: requester_id.to_string(),
            prompt: "A lighthouse at dusk".to_string(),
            jobs: providers
                .iter()
                .zip(task_ids)
                .enumerate()
                .map(|(idx, (provider, task_id))| NewJob {
                    variation_index: idx as u8,
                    provider: provider.to_string(),
                    provider_task_id: task_id.to_string(),
                    cost_units: 10,
                    provider_cost: None,
                })
                .collect(),
        }
    }
}
