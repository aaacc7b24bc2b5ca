//! Confirmation API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use labsync_core::{ConfirmationFilter, ConfirmationRecord, ConfirmationStore, SyncStatus};

use crate::state::AppState;

/// Maximum allowed limit for confirmation queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for confirmation queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for listing confirmations
#[derive(Debug, Deserialize)]
pub struct ListConfirmationsParams {
    /// Filter by sync status
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for listing confirmations
#[derive(Debug, Serialize)]
pub struct ListConfirmationsResponse {
    pub confirmations: Vec<ConfirmationRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ConfirmationErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ConfirmationErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ConfirmationErrorResponse {
            error: error.into(),
        }),
    )
}

/// List stored confirmations, most recently updated first
pub async fn list_confirmations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListConfirmationsParams>,
) -> Result<Json<ListConfirmationsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = ConfirmationFilter::new()
        .with_limit(limit)
        .with_offset(offset);

    if let Some(ref status) = params.status {
        let status: SyncStatus = status
            .parse()
            .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;
        filter = filter.with_status(status);
    }

    let confirmations = state
        .store()
        .list(&filter)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let total = state
        .store()
        .count(&filter)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(ListConfirmationsResponse {
        confirmations,
        total,
        limit,
        offset,
    }))
}

/// Get a confirmation by correlation id
pub async fn get_confirmation(
    State(state): State<Arc<AppState>>,
    Path(correlation_id): Path<String>,
) -> Result<Json<ConfirmationRecord>, ApiError> {
    match state.store().get(&correlation_id) {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Confirmation not found: {}", correlation_id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
