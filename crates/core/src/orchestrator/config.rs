//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the generation orchestrator and status reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Credits charged per variation. A group costs three times this.
    #[serde(default = "default_cost_per_scene")]
    pub cost_per_scene: u32,

    /// Deadline for each provider submission, applied per call.
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,

    /// Deadline for each provider status query, applied per call.
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// Clip length when the caller doesn't give one.
    #[serde(default = "default_duration")]
    pub default_duration_secs: u32,

    /// Aspect ratio when the caller doesn't give one.
    #[serde(default = "default_aspect_ratio")]
    pub default_aspect_ratio: String,

    /// Interval of the background watch started after each dispatch (milliseconds).
    /// 0 disables it; status is then only refreshed when clients poll.
    #[serde(default)]
    pub watch_interval_ms: u64,
}

fn default_cost_per_scene() -> u32 {
    10
}

fn default_submit_timeout() -> u64 {
    60
}

fn default_status_timeout() -> u64 {
    30
}

fn default_duration() -> u32 {
    5
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cost_per_scene: default_cost_per_scene(),
            submit_timeout_secs: default_submit_timeout(),
            status_timeout_secs: default_status_timeout(),
            default_duration_secs: default_duration(),
            default_aspect_ratio: default_aspect_ratio(),
            watch_interval_ms: 0,
        }
    }
}

impl OrchestratorConfig {
    /// Credits a full group costs.
    pub fn group_cost(&self) -> u64 {
        self.cost_per_scene as u64 * crate::job::VARIATIONS_PER_GROUP as u64
    }
}
