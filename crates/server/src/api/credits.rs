//! Credit balance API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use super::handlers::{error_response, ApiError};
use super::middleware::Requester;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub requester_id: String,
    pub balance: u64,
    /// Credits one generation costs.
    pub generation_cost: u64,
}

pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Requester(requester_id): Requester,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state
        .ledger()
        .balance(&requester_id)
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(BalanceResponse {
        requester_id,
        balance,
        generation_cost: state.orchestrator().config().group_cost(),
    }))
}
