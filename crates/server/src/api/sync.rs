//! Sync trigger handler.
//!
//! Accepts any method on `/api/v1/sync`. `OPTIONS` answers the CORS
//! preflight; everything else runs one full sync pass and returns its report.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use labsync_core::{ItemResult, StopReason, SyncSummary};

use crate::state::AppState;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Response for a completed run
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub summary: SyncSummary,
    pub stop_reason: StopReason,
    pub results: Vec<ItemResult>,
}

/// Response for an aborted run
#[derive(Debug, Serialize)]
pub struct SyncErrorResponse {
    pub success: bool,
    pub error: String,
    pub details: String,
}

/// Run a sync pass, or answer a preflight.
pub async fn trigger(method: Method, State(state): State<Arc<AppState>>) -> Response {
    if method == Method::OPTIONS {
        return with_cors(StatusCode::OK.into_response());
    }

    let response = match state.sync().run().await {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                summary: report.summary(),
                stop_reason: report.stop_reason,
                results: report.results,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Sync run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncErrorResponse {
                    success: false,
                    error: "Lab order confirmation sync failed".to_string(),
                    details: e.to_string(),
                }),
            )
                .into_response()
        }
    };

    with_cors(response)
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}
