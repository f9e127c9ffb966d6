//! Types for the generation orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::JobError;
use crate::provider::{ProviderError, SubmittedTask};

use super::VariationStrategy;

/// Errors that can occur during dispatch.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Prompt was empty or whitespace.
    #[error("prompt cannot be empty")]
    EmptyPrompt,

    /// The policy table references a provider that isn't registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// At least one variation failed to submit. No jobs were recorded.
    #[error("submission failed: {}", format_failures(.failures))]
    Submission { failures: Vec<SubmissionFailure> },

    /// Submissions succeeded but the group could not be recorded.
    #[error("job store error: {0}")]
    Store(#[from] JobError),
}

impl OrchestratorError {
    /// Returns true when the caller's request (not the system) caused the failure.
    pub fn is_caller_error(&self) -> bool {
        match self {
            OrchestratorError::EmptyPrompt => true,
            OrchestratorError::Submission { failures } => {
                failures.iter().any(|f| f.error.is_caller_error())
            }
            _ => false,
        }
    }
}

fn format_failures(failures: &[SubmissionFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("variation {} ({}): {}", f.variation_index, f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One variation that failed to submit.
#[derive(Debug)]
pub struct SubmissionFailure {
    pub variation_index: u8,
    pub strategy: VariationStrategy,
    pub provider: String,
    pub error: ProviderError,
}

/// Per-variation result of a concurrent submission round.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub strategy: VariationStrategy,
    pub provider: String,
    pub result: Result<SubmittedTask, ProviderError>,
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Caller parameters for a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchParams {
    pub prompt: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

impl DispatchParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }
}
