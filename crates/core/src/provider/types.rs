//! Types for video provider operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobState;

/// Errors that can occur while talking to a video provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request can't be fulfilled by this provider (e.g. missing seed image).
    #[error("Unsupported request: {0}")]
    UnsupportedRequest(String),

    /// The provider answered with a non-success status.
    #[error("{provider} rejected the request: {message}")]
    Rejected { provider: String, message: String },

    /// Network-level failure.
    #[error("{provider} transport error: {message}")]
    Transport { provider: String, message: String },

    /// The call did not complete within its deadline.
    #[error("{provider} request timed out")]
    Timeout { provider: String },

    /// The provider answered with a body we couldn't interpret.
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Adapter could not be constructed from its configuration.
    #[error("{provider} is misconfigured: {message}")]
    Configuration { provider: String, message: String },
}

impl ProviderError {
    /// Returns true for errors caused by the request itself rather than the provider.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ProviderError::UnsupportedRequest(_))
    }
}

/// Provider state after mapping onto the canonical lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedState {
    /// A state we know how to map.
    Known(JobState),
    /// Raw provider value we have no mapping for.
    Unknown(String),
}

impl ReportedState {
    /// Returns the canonical state, if known.
    pub fn known(&self) -> Option<JobState> {
        match self {
            ReportedState::Known(state) => Some(*state),
            ReportedState::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for ReportedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedState::Known(state) => write!(f, "{}", state),
            ReportedState::Unknown(raw) => write!(f, "unknown({})", raw),
        }
    }
}

/// Canonical, provider-agnostic generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully augmented prompt sent to the provider.
    pub prompt: String,
    /// Seed image for image-to-video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// End keyframe (luma only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_end_url: Option<String>,
    pub duration_secs: u32,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Name of the provider this request targets.
    pub provider: String,
    /// Loop the clip (luma only).
    #[serde(default)]
    pub loop_video: bool,
}

impl GenerationRequest {
    /// Create a request with default duration and aspect ratio.
    pub fn new(prompt: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_url: None,
            image_end_url: None,
            duration_secs: 5,
            aspect_ratio: "16:9".to_string(),
            style: None,
            provider: provider.into(),
            loop_video: false,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_image_end_url(mut self, url: impl Into<String>) -> Self {
        self.image_end_url = Some(url.into());
        self
    }

    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_loop(mut self, loop_video: bool) -> Self {
        self.loop_video = loop_video;
        self
    }
}

/// Cost a provider reports (or that we estimate) for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCost {
    /// Provider-native credits, when the provider bills in credits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    pub usd: f64,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTask {
    pub provider: String,
    /// Opaque provider-side handle.
    pub task_id: String,
    /// Always pending right after submission.
    pub state: JobState,
    pub estimated_cost: Option<ProviderCost>,
}

impl SubmittedTask {
    pub fn pending(provider: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            task_id: task_id.into(),
            state: JobState::Pending,
            estimated_cost: None,
        }
    }

    pub fn with_cost(mut self, cost: ProviderCost) -> Self {
        self.estimated_cost = Some(cost);
        self
    }
}

/// Normalized status of a provider task.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub state: ReportedState,
    /// 0-100.
    pub progress: u8,
    /// Ephemeral artifact URL.
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub failure_reason: Option<String>,
}

impl ProviderStatus {
    pub fn new(state: ReportedState) -> Self {
        let progress = if state == ReportedState::Known(JobState::Completed) {
            100
        } else {
            0
        };
        Self {
            state,
            progress,
            url: None,
            thumbnail_url: None,
            failure_reason: None,
        }
    }

    /// Set progress, clamped to 0-100. Completed tasks always report 100.
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = if self.state == ReportedState::Known(JobState::Completed) {
            100
        } else {
            progress.min(100)
        };
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Capability contract every video provider adapter implements.
///
/// Adapters translate the canonical request into the provider's wire format
/// and map its status vocabulary onto [`JobState`]. They never retry.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Registry name (e.g. "luma").
    fn name(&self) -> &str;

    /// Submit a generation request.
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedTask, ProviderError>;

    /// Query the current status of a submitted task.
    async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_status_reports_full_progress() {
        let status = ProviderStatus::new(ReportedState::Known(JobState::Completed)).with_progress(40);
        assert_eq!(status.progress, 100);
    }

    #[test]
    fn test_progress_clamped() {
        let status = ProviderStatus::new(ReportedState::Known(JobState::Processing)).with_progress(250);
        assert_eq!(status.progress, 100);

        let status = ProviderStatus::new(ReportedState::Unknown("weird".to_string()));
        assert_eq!(status.progress, 0);
    }

    #[test]
    fn test_reported_state_display() {
        assert_eq!(
            ReportedState::Known(JobState::Processing).to_string(),
            "processing"
        );
        assert_eq!(
            ReportedState::Unknown("dreaming_hard".to_string()).to_string(),
            "unknown(dreaming_hard)"
        );
    }

    #[test]
    fn test_request_builder_defaults() {
        let request = GenerationRequest::new("a fox", "luma")
            .with_image_url("https://img.example/fox.png")
            .with_duration_secs(10);

        assert_eq!(request.aspect_ratio, "16:9");
        assert_eq!(request.duration_secs, 10);
        assert_eq!(request.image_url.as_deref(), Some("https://img.example/fox.png"));
        assert!(!request.loop_video);
    }

    #[test]
    fn test_unsupported_request_is_caller_error() {
        assert!(ProviderError::UnsupportedRequest("no image".to_string()).is_caller_error());
        assert!(!ProviderError::Timeout {
            provider: "luma".to_string()
        }
        .is_caller_error());
    }
}
