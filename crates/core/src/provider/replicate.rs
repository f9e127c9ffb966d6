//! Replicate (Stable Video Diffusion) provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReplicateConfig;
use crate::job::JobState;

use super::http::{build_client, send_json, trim_base};
use super::{
    GenerationRequest, ProviderCost, ProviderError, ProviderStatus, ReportedState, SubmittedTask,
    VideoProvider,
};

const PROVIDER: &str = "replicate";

/// Flat estimate per prediction.
const ESTIMATED_USD_PER_VIDEO: f64 = 0.18;

/// Replicate client. Stable Video Diffusion is image-to-video only.
pub struct ReplicateProvider {
    client: Client,
    config: ReplicateConfig,
}

impl ReplicateProvider {
    /// Create a new Replicate client.
    pub fn new(config: ReplicateConfig) -> Result<Self, ProviderError> {
        let client = build_client(PROVIDER, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", trim_base(&self.config.base_url), path)
    }

    fn prediction_body<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Result<PredictionBody<'a>, ProviderError> {
        let image = request.image_url.as_deref().ok_or_else(|| {
            ProviderError::UnsupportedRequest(
                "Stable Video Diffusion requires an input image; use luma or runway for text-to-video"
                    .to_string(),
            )
        })?;

        Ok(PredictionBody {
            version: &self.config.model_version,
            input: PredictionInput {
                image,
                motion_bucket_id: self.config.motion_bucket_id,
                fps: self.config.fps,
                cond_aug: self.config.cond_aug,
                decoding_t: self.config.decoding_t,
                video_length: &self.config.video_length,
            },
        })
    }
}

#[derive(Debug, Serialize)]
struct PredictionBody<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    image: &'a str,
    motion_bucket_id: u32,
    fps: u32,
    cond_aug: f64,
    decoding_t: u32,
    video_length: &'a str,
}

/// Replicate prediction response.
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<PredictionOutput>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Output is a single URL or a list of URLs depending on the model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionOutput {
    Single(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    fn first(self) -> Option<String> {
        match self {
            PredictionOutput::Single(url) => Some(url),
            PredictionOutput::Many(urls) => urls.into_iter().next(),
        }
    }
}

impl Prediction {
    fn into_status(self) -> ProviderStatus {
        let state = map_replicate_state(self.status.as_deref().unwrap_or("starting"));

        // Replicate doesn't report progress for this model
        let progress = match state {
            ReportedState::Known(JobState::Processing) => 50,
            _ => 0,
        };

        let mut status = ProviderStatus::new(state).with_progress(progress);
        status.url = self
            .output
            .and_then(PredictionOutput::first)
            .filter(|url| !url.is_empty());
        status.failure_reason = self.error.and_then(|e| match e {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        status
    }
}

/// Map Replicate's state vocabulary onto the canonical lifecycle.
fn map_replicate_state(state: &str) -> ReportedState {
    match state {
        "starting" => ReportedState::Known(JobState::Pending),
        "processing" => ReportedState::Known(JobState::Processing),
        "succeeded" => ReportedState::Known(JobState::Completed),
        "failed" | "canceled" => ReportedState::Known(JobState::Failed),
        other => ReportedState::Unknown(other.to_string()),
    }
}

#[async_trait]
impl VideoProvider for ReplicateProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedTask, ProviderError> {
        let body = self.prediction_body(request)?;

        let prediction: Prediction = send_json(
            PROVIDER,
            self.client
                .post(self.url("/predictions"))
                .bearer_auth(&self.config.api_key)
                .json(&body),
        )
        .await?;

        debug!(task_id = %prediction.id, "Replicate prediction created");

        Ok(
            SubmittedTask::pending(PROVIDER, prediction.id).with_cost(ProviderCost {
                credits: None,
                usd: ESTIMATED_USD_PER_VIDEO,
            }),
        )
    }

    async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError> {
        let prediction: Prediction = send_json(
            PROVIDER,
            self.client
                .get(self.url(&format!("/predictions/{}", urlencoding::encode(task_id))))
                .bearer_auth(&self.config.api_key),
        )
        .await?;

        Ok(prediction.into_status())
    }
}
