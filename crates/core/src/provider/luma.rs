//! Luma Dream Machine provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LumaConfig;
use crate::job::JobState;

use super::http::{build_client, send_json, trim_base};
use super::{
    GenerationRequest, ProviderCost, ProviderError, ProviderStatus, ReportedState, SubmittedTask,
    VideoProvider,
};

const PROVIDER: &str = "luma";

/// Flat estimate per generation.
const ESTIMATED_USD_PER_VIDEO: f64 = 0.32;

/// Luma Dream Machine client (text-to-video and image-to-video).
pub struct LumaProvider {
    client: Client,
    config: LumaConfig,
}

impl LumaProvider {
    /// Create a new Luma client.
    pub fn new(config: LumaConfig) -> Result<Self, ProviderError> {
        let client = build_client(PROVIDER, config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", trim_base(&self.config.base_url), path)
    }
}

/// Luma generation request body.
#[derive(Debug, Serialize)]
struct LumaGenerationBody<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
    #[serde(rename = "loop")]
    loop_video: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_end_url: Option<&'a str>,
}

impl<'a> LumaGenerationBody<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        let image_url = request.image_url.as_deref();
        Self {
            prompt: &request.prompt,
            aspect_ratio: &request.aspect_ratio,
            loop_video: request.loop_video,
            image_url,
            // End keyframe only makes sense alongside a start image
            image_end_url: image_url.and(request.image_end_url.as_deref()),
        }
    }
}

/// Luma generation response (both for create and get).
#[derive(Debug, Deserialize)]
struct LumaGeneration {
    id: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    assets: Option<LumaAssets>,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LumaAssets {
    #[serde(default)]
    video: Option<LumaAsset>,
    #[serde(default)]
    image: Option<LumaAsset>,
}

/// Assets show up either as bare URLs or as `{ "url": ... }` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LumaAsset {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

impl LumaAsset {
    fn into_url(self) -> Option<String> {
        match self {
            LumaAsset::Url(url) => Some(url),
            LumaAsset::Object { url } => url,
        }
        .filter(|url| !url.is_empty())
    }
}

impl LumaGeneration {
    fn into_status(self) -> ProviderStatus {
        let state = map_luma_state(self.state.as_deref().unwrap_or("queued"));
        let mut status = ProviderStatus::new(state);

        if let Some(assets) = self.assets {
            status.url = assets.video.and_then(LumaAsset::into_url);
            status.thumbnail_url = assets.image.and_then(LumaAsset::into_url);
        }
        status.failure_reason = self.failure_reason.filter(|r| !r.is_empty());
        status
    }
}

/// Map Luma's state vocabulary onto the canonical lifecycle.
fn map_luma_state(state: &str) -> ReportedState {
    match state {
        "queued" => ReportedState::Known(JobState::Pending),
        "dreaming" | "processing" => ReportedState::Known(JobState::Processing),
        "completed" => ReportedState::Known(JobState::Completed),
        "failed" => ReportedState::Known(JobState::Failed),
        other => ReportedState::Unknown(other.to_string()),
    }
}

#[async_trait]
impl VideoProvider for LumaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<SubmittedTask, ProviderError> {
        let body = LumaGenerationBody::from_request(request);

        let generation: LumaGeneration = send_json(
            PROVIDER,
            self.client
                .post(self.url("/generations"))
                .bearer_auth(&self.config.api_key)
                .json(&body),
        )
        .await?;

        debug!(task_id = %generation.id, "Luma generation submitted");

        Ok(
            SubmittedTask::pending(PROVIDER, generation.id).with_cost(ProviderCost {
                credits: None,
                usd: ESTIMATED_USD_PER_VIDEO,
            }),
        )
    }

    async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError> {
        let generation: LumaGeneration = send_json(
            PROVIDER,
            self.client
                .get(self.url(&format!("/generations/{}", urlencoding::encode(task_id))))
                .bearer_auth(&self.config.api_key),
        )
        .await?;

        Ok(generation.into_status())
    }
}
