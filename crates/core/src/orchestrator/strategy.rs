//! The fixed policy table mapping variation slots to providers and prompts.

use serde::{Deserialize, Serialize};

use crate::provider::GenerationRequest;

use super::{DispatchParams, OrchestratorConfig};

/// One row of the variation policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationStrategy {
    Cinematic,
    Stylized,
    WideAngle,
}

const DEFAULT_STYLE: &str = "High contrast, dramatic shadows, stylized aesthetic.";

impl VariationStrategy {
    /// All strategies, ordered by variation index.
    pub const ALL: [VariationStrategy; 3] = [
        VariationStrategy::Cinematic,
        VariationStrategy::Stylized,
        VariationStrategy::WideAngle,
    ];

    /// Strategy for a variation slot.
    pub fn for_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u8 {
        match self {
            VariationStrategy::Cinematic => 0,
            VariationStrategy::Stylized => 1,
            VariationStrategy::WideAngle => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariationStrategy::Cinematic => "cinematic",
            VariationStrategy::Stylized => "stylized",
            VariationStrategy::WideAngle => "wide_angle",
        }
    }

    /// Provider this variation is submitted to.
    pub fn provider(&self) -> &'static str {
        match self {
            VariationStrategy::Cinematic => "luma",
            VariationStrategy::Stylized => "runway",
            VariationStrategy::WideAngle => "luma",
        }
    }

    /// Augment the base prompt. A caller style replaces the stylized suffix.
    pub fn augment_prompt(&self, prompt: &str, style: Option<&str>) -> String {
        let suffix = match self {
            VariationStrategy::Cinematic => {
                "Cinematic lighting, professional color grading, 24fps film look."
            }
            VariationStrategy::Stylized => style
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_STYLE),
            VariationStrategy::WideAngle => {
                "Wide angle shot, atmospheric depth, slight camera movement."
            }
        };
        format!("{}. {}", prompt, suffix)
    }

    /// Build the canonical request for this variation.
    pub fn build_request(
        &self,
        params: &DispatchParams,
        config: &OrchestratorConfig,
    ) -> GenerationRequest {
        let mut request = GenerationRequest::new(
            self.augment_prompt(&params.prompt, params.style.as_deref()),
            self.provider(),
        )
        .with_duration_secs(params.duration_secs.unwrap_or(config.default_duration_secs))
        .with_aspect_ratio(
            params
                .aspect_ratio
                .clone()
                .unwrap_or_else(|| config.default_aspect_ratio.clone()),
        );

        if let Some(image_url) = &params.image_url {
            request = request.with_image_url(image_url.clone());
        }
        if let Some(style) = &params.style {
            request = request.with_style(style.clone());
        }
        request
    }
}

impl std::fmt::Display for VariationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the three requests of a dispatch, ordered by variation index.
pub fn build_requests(
    params: &DispatchParams,
    config: &OrchestratorConfig,
) -> Vec<(VariationStrategy, GenerationRequest)> {
    VariationStrategy::ALL
        .iter()
        .map(|strategy| (*strategy, strategy.build_request(params, config)))
        .collect()
}
