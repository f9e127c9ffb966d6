//! Mock video provider for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::job::JobState;
use crate::provider::{
    GenerationRequest, ProviderError, ProviderStatus, ReportedState, SubmittedTask, VideoProvider,
};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    /// The request that was made.
    pub request: GenerationRequest,
    /// Task id handed back to the caller.
    pub task_id: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Mock implementation of the VideoProvider trait.
///
/// Provides controllable behavior for testing:
/// - Track submissions for assertions
/// - Script task statuses per task id
/// - Simulate rejections, transport errors and slow responses
///
/// # Example
///
/// ```rust,ignore
/// let provider = MockProvider::new("luma");
///
/// let task = provider.submit(&GenerationRequest::new("a fox", "luma")).await?;
/// provider
///     .set_status(&task.task_id, ProviderStatus::new(ReportedState::Known(JobState::Completed))
///         .with_url("https://cdn.test/v.mp4"))
///     .await;
///
/// assert_eq!(provider.submissions().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    /// Recorded submit calls.
    submissions: Arc<RwLock<Vec<RecordedSubmission>>>,
    /// Scripted statuses by task id. Unscripted tasks report pending.
    statuses: Arc<RwLock<HashMap<String, ProviderStatus>>>,
    /// Status queries that fail, by task id.
    status_failures: Arc<RwLock<HashMap<String, String>>>,
    /// Number of status queries per task id.
    status_queries: Arc<RwLock<HashMap<String, usize>>>,
    /// If set, the next operation fails with this error.
    next_error: Arc<RwLock<Option<ProviderError>>>,
    /// If set, every submission is rejected with this message.
    submit_failure: Arc<RwLock<Option<String>>>,
    submit_delay: Arc<RwLock<Option<Duration>>>,
    status_delay: Arc<RwLock<Option<Duration>>>,
    /// Counter for generating unique task ids.
    task_counter: Arc<RwLock<u32>>,
    require_image: bool,
}

impl MockProvider {
    /// Create a mock provider registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            submissions: Arc::new(RwLock::new(Vec::new())),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            status_failures: Arc::new(RwLock::new(HashMap::new())),
            status_queries: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            submit_failure: Arc::new(RwLock::new(None)),
            submit_delay: Arc::new(RwLock::new(None)),
            status_delay: Arc::new(RwLock::new(None)),
            task_counter: Arc::new(RwLock::new(0)),
            require_image: false,
        }
    }

    /// Reject text-only requests, like an image-to-video-only provider.
    pub fn requiring_image(mut self) -> Self {
        self.require_image = true;
        self
    }

    /// Get all recorded submissions.
    pub async fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.read().await.clone()
    }

    /// Script the status reported for a task.
    pub async fn set_status(&self, task_id: &str, status: ProviderStatus) {
        self.statuses
            .write()
            .await
            .insert(task_id.to_string(), status);
    }

    /// Shorthand for a known state with the given progress.
    pub async fn set_state(&self, task_id: &str, state: JobState, progress: u8) {
        self.set_status(
            task_id,
            ProviderStatus::new(ReportedState::Known(state)).with_progress(progress),
        )
        .await;
    }

    /// Make status queries for a task fail (or succeed again with `None`).
    pub async fn set_status_failure(&self, task_id: &str, message: Option<&str>) {
        let mut failures = self.status_failures.write().await;
        match message {
            Some(msg) => {
                failures.insert(task_id.to_string(), msg.to_string());
            }
            None => {
                failures.remove(task_id);
            }
        }
    }

    /// Set an error to be returned by the next operation.
    pub async fn set_next_error(&self, error: ProviderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Reject every submission with `message` (or stop with `None`).
    pub async fn set_submit_failure(&self, message: Option<&str>) {
        *self.submit_failure.write().await = message.map(str::to_string);
    }

    pub async fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.write().await = Some(delay);
    }

    pub async fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.write().await = Some(delay);
    }

    /// How many times the status of `task_id` was queried.
    pub async fn status_queries(&self, task_id: &str) -> usize {
        self.status_queries
            .read()
            .await
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    async fn take_error(&self) -> Option<ProviderError> {
        self.next_error.write().await.take()
    }

    async fn next_task_id(&self) -> String {
        let mut counter = self.task_counter.write().await;
        *counter += 1;
        format!("{}-task-{}", self.name, *counter)
    }
}

#[async_trait]
impl VideoProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedTask, ProviderError> {
        let delay = *self.submit_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let task_id = self.next_task_id().await;
        self.submissions.write().await.push(RecordedSubmission {
            request: request.clone(),
            task_id: task_id.clone(),
            timestamp: Utc::now(),
        });

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        if let Some(message) = self.submit_failure.read().await.clone() {
            return Err(ProviderError::Rejected {
                provider: self.name.clone(),
                message,
            });
        }

        if self.require_image && request.image_url.is_none() {
            return Err(ProviderError::UnsupportedRequest(format!(
                "{} requires an input image",
                self.name
            )));
        }

        Ok(SubmittedTask::pending(&self.name, task_id))
    }

    async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError> {
        *self
            .status_queries
            .write()
            .await
            .entry(task_id.to_string())
            .or_insert(0) += 1;

        let delay = *self.status_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        if let Some(message) = self.status_failures.read().await.get(task_id) {
            return Err(ProviderError::Transport {
                provider: self.name.clone(),
                message: message.clone(),
            });
        }

        Ok(self
            .statuses
            .read()
            .await
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| ProviderStatus::new(ReportedState::Known(JobState::Pending))))
    }
}
