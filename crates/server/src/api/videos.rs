//! Video generation API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use triptych_core::{
    job::{Job, JobGroup, JobState},
    orchestrator::{DispatchParams, OrchestratorError},
    reconciler::ReconcileError,
    storage::DeliveryError,
    DownloadLink, LedgerError,
};

use super::handlers::{error_response, ApiError, ErrorResponse};
use super::middleware::Requester;
use crate::metrics::CREDIT_OPERATIONS;
use crate::state::AppState;

/// Maximum allowed limit for list queries
const MAX_LIMIT: i64 = 100;

/// Default limit for list queries
const DEFAULT_LIMIT: i64 = 20;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a generation
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub prompt: String,
    /// Seed image for image-to-video
    pub image_url: Option<String>,
    /// Style text for the stylized variation
    pub style: Option<String>,
    /// Clip length in seconds
    pub duration: Option<u32>,
    pub aspect_ratio: Option<String>,
}

/// One submitted variation
#[derive(Debug, Serialize)]
pub struct SceneResponse {
    pub job_id: String,
    pub variation: u8,
    pub provider: String,
    pub task_id: String,
    pub state: JobState,
}

impl From<&Job> for SceneResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            variation: job.variation_index,
            provider: job.provider.clone(),
            task_id: job.provider_task_id.clone(),
            state: job.state,
        }
    }
}

/// Response for a successful generation
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub parent_id: String,
    pub total_cost: u32,
    pub scenes: Vec<SceneResponse>,
}

/// Per-job refresh failure
#[derive(Debug, Serialize)]
pub struct JobErrorEntry {
    pub job_id: String,
    pub error: String,
}

/// Response for a status refresh
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub parent_id: String,
    pub prompt: String,
    pub total_cost: u32,
    /// True once every job reached a terminal state.
    pub finished: bool,
    pub jobs: Vec<Job>,
    pub errors: Vec<JobErrorEntry>,
}

/// Response for a download request
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// "signed" for the durable copy, "provider_fallback" otherwise
    pub source: &'static str,
}

impl From<DownloadLink> for DownloadResponse {
    fn from(link: DownloadLink) -> Self {
        let source = match link {
            DownloadLink::Signed { .. } => "signed",
            DownloadLink::ProviderFallback { .. } => "provider_fallback",
        };
        Self {
            download_url: link.url().to_string(),
            expires_in: link.expires_in(),
            source,
        }
    }
}

/// Query parameters for listing generations
#[derive(Debug, Deserialize)]
pub struct ListVideosParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for listing generations
#[derive(Debug, Serialize)]
pub struct ListVideosResponse {
    pub groups: Vec<JobGroup>,
    pub limit: i64,
    pub offset: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Charge the requester and dispatch three variations.
///
/// Credits are returned if the dispatch fails for any reason. Charging and
/// dispatch run on their own task so a client disconnect cannot strand a
/// debit without jobs.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Requester(requester_id): Requester,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            OrchestratorError::EmptyPrompt.to_string(),
        ));
    }

    let params = DispatchParams {
        prompt: body.prompt,
        image_url: body.image_url,
        style: body.style,
        duration_secs: body.duration,
        aspect_ratio: body.aspect_ratio,
    };

    let task_state = Arc::clone(&state);
    let group = tokio::spawn(async move {
        charge_and_dispatch(&task_state, &requester_id, &params).await
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Generation task failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Generation task failed")
    })??;

    spawn_watch(&state, &group.parent_id);

    Ok(Json(GenerateResponse {
        message: format!("Started {} variations", group.jobs.len()),
        parent_id: group.parent_id.clone(),
        total_cost: group.total_cost,
        scenes: group.jobs.iter().map(SceneResponse::from).collect(),
    }))
}

/// Debit the group cost, dispatch, and refund if the dispatch fails.
async fn charge_and_dispatch(
    state: &AppState,
    requester_id: &str,
    params: &DispatchParams,
) -> Result<JobGroup, ApiError> {
    let cost = state.orchestrator().config().group_cost();
    match state.ledger().check_and_debit(requester_id, cost) {
        Ok(remaining) => {
            CREDIT_OPERATIONS.with_label_values(&["debit"]).inc();
            info!(requester_id, cost, remaining, "Credits debited");
        }
        Err(LedgerError::InsufficientFunds {
            required,
            available,
        }) => {
            CREDIT_OPERATIONS
                .with_label_values(&["insufficient_funds"])
                .inc();
            return Err((
                StatusCode::PAYMENT_REQUIRED,
                Json(ErrorResponse {
                    error: "Insufficient credits".to_string(),
                    required: Some(required),
                    available: Some(available),
                }),
            ));
        }
        Err(e) => {
            error!(requester_id, error = %e, "Credit check failed");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ));
        }
    }

    match state.orchestrator().dispatch(params, requester_id).await {
        Ok(group) => Ok(group),
        Err(e) => {
            refund(state, requester_id, cost);
            let status = if e.is_caller_error() {
                StatusCode::BAD_REQUEST
            } else {
                match e {
                    OrchestratorError::Submission { .. } => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                }
            };
            Err(error_response(status, e.to_string()))
        }
    }
}

/// Refresh and return a generation, by parent id or any of its job ids.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Requester(requester_id): Requester,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let owned = state
        .job_store()
        .get_group(&id)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .is_some_and(|group| group.requester_id == requester_id);
    if !owned {
        return Err(error_response(StatusCode::NOT_FOUND, "Generation not found"));
    }

    let (group, report) = state
        .reconciler()
        .refresh_group(&id)
        .await
        .map_err(|e| match e {
            ReconcileError::NotFound(_) => {
                error_response(StatusCode::NOT_FOUND, "Generation not found")
            }
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let errors = report
        .errors()
        .into_iter()
        .map(|(job_id, error)| JobErrorEntry { job_id, error })
        .collect();

    Ok(Json(StatusResponse {
        parent_id: group.parent_id,
        prompt: group.prompt,
        total_cost: group.total_cost,
        finished: report.all_terminal(),
        jobs: group.jobs,
        errors,
    }))
}

/// Resolve a download URL for one job.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Requester(requester_id): Requester,
    Path(job_id): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let ttl = state.config().storage.signed_url_ttl_secs;
    triptych_core::resolve_download(
        state.job_store(),
        state.storage(),
        &job_id,
        &requester_id,
        ttl,
    )
    .await
    .map(|link| Json(DownloadResponse::from(link)))
    .map_err(|e| match e {
        DeliveryError::NotFound => error_response(StatusCode::NOT_FOUND, e.to_string()),
        DeliveryError::NotReady => error_response(StatusCode::CONFLICT, e.to_string()),
        DeliveryError::Job(inner) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
        }
    })
}

/// List the requester's generations, newest first.
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    Requester(requester_id): Requester,
    Query(params): Query<ListVideosParams>,
) -> Result<Json<ListVideosResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let groups = state
        .job_store()
        .list_groups(&requester_id, limit, offset)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ListVideosResponse {
        groups,
        limit,
        offset,
    }))
}

fn refund(state: &AppState, requester_id: &str, amount: u64) {
    match state.ledger().refund(requester_id, amount) {
        Ok(balance) => {
            CREDIT_OPERATIONS.with_label_values(&["refund"]).inc();
            info!(requester_id, amount, balance, "Credits refunded after failed dispatch");
        }
        Err(e) => {
            error!(requester_id, amount, error = %e, "Failed to refund credits");
        }
    }
}

/// Start a background watch for the group when configured.
fn spawn_watch(state: &AppState, parent_id: &str) {
    let interval_ms = state.orchestrator().config().watch_interval_ms;
    if interval_ms == 0 {
        return;
    }

    let reconciler = state.reconciler().clone();
    let shutdown = state.shutdown_signal();
    let parent_id = parent_id.to_string();
    tokio::spawn(async move {
        if let Err(e) = reconciler
            .watch(&parent_id, Duration::from_millis(interval_ms), shutdown)
            .await
        {
            warn!(parent_id = %parent_id, error = %e, "Background watch stopped");
        }
    });
}
