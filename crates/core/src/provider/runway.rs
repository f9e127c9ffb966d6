//! Runway provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RunwayConfig;
use crate::job::JobState;

use super::http::{build_client, send_json, trim_base};
use super::{
    GenerationRequest, ProviderCost, ProviderError, ProviderStatus, ReportedState, SubmittedTask,
    VideoProvider,
};

const PROVIDER: &str = "runway";

/// Model used for text-to-video.
const TEXT_MODEL: &str = "gen3a_alpha";
/// Model used when a seed image is present (cheaper and faster).
const IMAGE_MODEL: &str = "gen3a_turbo";

/// USD per Runway credit.
const USD_PER_CREDIT: f64 = 0.01;

/// Runway client (text-to-video and image-to-video).
pub struct RunwayProvider {
    client: Client,
    config: RunwayConfig,
}

impl RunwayProvider {
    /// Create a new Runway client.
    pub fn new(config: RunwayConfig) -> Result<Self, ProviderError> {
        let client = build_client(PROVIDER, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", trim_base(&self.config.base_url), path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.config.api_key)
            .header("X-Runway-Version", &self.config.api_version)
    }
}

/// Runway task creation body.
#[derive(Debug, Serialize)]
struct RunwayTaskBody<'a> {
    prompt: &'a str,
    ratio: &'a str,
    duration: u32,
    model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

impl<'a> RunwayTaskBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let image_url = request.image_url.as_deref();
        Self {
            prompt: &request.prompt,
            ratio: &request.aspect_ratio,
            duration: request.duration_secs,
            model: if image_url.is_some() {
                IMAGE_MODEL
            } else {
                TEXT_MODEL
            },
            image_url,
        }
    }

    fn endpoint(&self) -> &'static str {
        if self.image_url.is_some() {
            "/image_to_video"
        } else {
            "/text_to_video"
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunwayCreated {
    id: String,
}

/// Runway task status response.
#[derive(Debug, Deserialize)]
struct RunwayTask {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    output: Option<Vec<String>>,
    #[serde(default)]
    failure: Option<String>,
}

impl RunwayTask {
    fn into_status(self) -> ProviderStatus {
        let state = map_runway_state(&self.status);
        let progress = self.progress.map(normalize_progress).unwrap_or(0);

        let mut status = ProviderStatus::new(state).with_progress(progress);
        status.url = self
            .url
            .or_else(|| self.output.and_then(|o| o.into_iter().next()))
            .filter(|url| !url.is_empty());
        status.failure_reason = self.failure.filter(|f| !f.is_empty());
        status
    }
}

/// Map Runway's state vocabulary onto the canonical lifecycle.
fn map_runway_state(state: &str) -> ReportedState {
    match state {
        "PENDING" | "pending" | "THROTTLED" => ReportedState::Known(JobState::Pending),
        "RUNNING" | "processing" => ReportedState::Known(JobState::Processing),
        "SUCCEEDED" | "completed" => ReportedState::Known(JobState::Completed),
        "FAILED" | "CANCELLED" | "failed" => ReportedState::Known(JobState::Failed),
        other => ReportedState::Unknown(other.to_string()),
    }
}

/// Runway reports progress either as a 0-1 fraction or a 0-100 percentage.
fn normalize_progress(raw: f64) -> u8 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    let percent = if raw <= 1.0 { raw * 100.0 } else { raw };
    percent.round().min(100.0) as u8
}

/// Credits per second of output for each model.
fn credits_per_second(model: &str) -> u32 {
    match model {
        "gen3a_alpha" => 10,
        "gen3a_turbo" => 5,
        "gen4_turbo" => 5,
        "gen4_aleph" => 15,
        _ => 10,
    }
}

/// Estimate what a generation costs in Runway credits and USD.
pub(crate) fn estimate_cost(model: &str, duration_secs: u32) -> ProviderCost {
    let credits = credits_per_second(model) * duration_secs;
    ProviderCost {
        credits: Some(credits),
        usd: credits as f64 * USD_PER_CREDIT,
    }
}

#[async_trait]
impl VideoProvider for RunwayProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedTask, ProviderError> {
        let body = RunwayTaskBody::from_request(request);

        let created: RunwayCreated = send_json(
            PROVIDER,
            self.authorized(self.client.post(self.url(body.endpoint())))
                .json(&body),
        )
        .await?;

        debug!(task_id = %created.id, model = body.model, "Runway task submitted");

        Ok(SubmittedTask::pending(PROVIDER, created.id)
            .with_cost(estimate_cost(body.model, body.duration)))
    }

    async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError> {
        let task: RunwayTask = send_json(
            PROVIDER,
            self.authorized(
                self.client
                    .get(self.url(&format!("/tasks/{}", urlencoding::encode(task_id)))),
            ),
        )
        .await?;

        Ok(task.into_status())
    }
}
