//! Health probes and runtime status.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
    pub data_dir: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub organism: String,
    pub summarizer_enabled: bool,
    pub history_pruning: bool,
}

/// `GET /api/system/health/live`
pub async fn health_live() -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse { status: "alive" }))
}

/// `GET /api/system/health`
///
/// Ready when the database answers and the artifact directory exists.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let database = state.store().ping().await.is_ok();

    let data_dir = {
        let config = state.config().read().await;
        config.pipeline.data_dir.clone()
    };
    let data_dir = tokio::fs::metadata(Path::new(&data_dir))
        .await
        .is_ok_and(|m| m.is_dir());

    let ready = database && data_dir;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready,
            checks: HealthReadinessChecks { database, data_dir },
        })),
    )
        .into_response()
}

/// `GET /api/system/status`
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SystemStatus>> {
    let config = state.config().read().await;
    Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        organism: config.pipeline.organism.clone(),
        summarizer_enabled: config.tools.summarizer.enabled,
        history_pruning: config.history.prune_enabled,
    }))
}
