use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::session_user;
use super::validation::{validate_gene_id, validate_sequence_id, validate_threshold};
use super::{ApiError, ApiResponse, AppState, SessionView};
use crate::constants::limits::{DEFAULT_TERM_THRESHOLD, MAX_UPLOAD_BYTES};
use crate::constants::session::PIPELINE_KEY;
use crate::db::{ReportRecord, SequenceRecord};
use crate::parser::annotation::GoTerm;
use crate::pipeline::PipelineSession;
use crate::report::AnalysisSummary;
use crate::services::{ModelInfo, StepRun, UploadRequest};

#[derive(Serialize)]
pub struct UploadResponse {
    pub sequence: SequenceRecord,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct RunResponse {
    pub run: StepRun,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct FinalResponse {
    pub summary: AnalysisSummary,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub report: ReportRecord,
    pub session: SessionView,
}

#[derive(Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<f64>,
}

pub(crate) async fn load_pipeline(session: &Session) -> Result<PipelineSession, ApiError> {
    Ok(session
        .get::<PipelineSession>(PIPELINE_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .unwrap_or_default())
}

pub(crate) async fn save_pipeline(
    session: &Session,
    pipeline: &PipelineSession,
) -> Result<(), ApiError> {
    session
        .insert(PIPELINE_KEY, pipeline)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))
}

/// GET /pipeline
pub async fn get_pipeline(session: Session) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    session_user(&session).await?;
    let pipeline = load_pipeline(&session).await?;
    Ok(Json(ApiResponse::success(SessionView::from(&pipeline))))
}

/// POST /pipeline/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    if payload.content.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::validation(format!(
            "Upload exceeds {MAX_UPLOAD_BYTES} bytes"
        )));
    }

    let mut pipeline = load_pipeline(&session).await?;
    let sequence = state
        .analysis_service()
        .upload(user_id, &mut pipeline, payload)
        .await?;
    save_pipeline(&session, &pipeline).await?;

    Ok(Json(ApiResponse::success(UploadResponse {
        sequence,
        session: SessionView::from(&pipeline),
    })))
}

/// POST /pipeline/run
/// Run the current step. A failure answers 422 with the tool diagnostic.
pub async fn run_step(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<RunResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;

    let run = state
        .analysis_service()
        .run_step(user_id, &mut pipeline)
        .await?;
    save_pipeline(&session, &pipeline).await?;

    Ok(Json(ApiResponse::success(RunResponse {
        run,
        session: SessionView::from(&pipeline),
    })))
}

/// POST /pipeline/advance
pub async fn advance(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;
    state.analysis_service().advance(&mut pipeline)?;
    save_pipeline(&session, &pipeline).await?;
    Ok(Json(ApiResponse::success(SessionView::from(&pipeline))))
}

/// POST /pipeline/retreat
pub async fn retreat(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;
    state.analysis_service().retreat(&mut pipeline)?;
    save_pipeline(&session, &pipeline).await?;
    Ok(Json(ApiResponse::success(SessionView::from(&pipeline))))
}

/// POST /pipeline/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let user_id = session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;
    state
        .analysis_service()
        .reset(user_id, &mut pipeline)
        .await?;
    save_pipeline(&session, &pipeline).await?;
    Ok(Json(ApiResponse::success(SessionView::from(&pipeline))))
}

/// POST /pipeline/resume/{id}
pub async fn resume(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SessionView>>, ApiError> {
    let user_id = session_user(&session).await?;
    let sequence_id = validate_sequence_id(id)?;

    let mut pipeline = load_pipeline(&session).await?;
    state
        .analysis_service()
        .resume(user_id, &mut pipeline, sequence_id)
        .await?;
    save_pipeline(&session, &pipeline).await?;
    Ok(Json(ApiResponse::success(SessionView::from(&pipeline))))
}

/// POST /pipeline/final
pub async fn final_results(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<FinalResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;
    let summary = state
        .analysis_service()
        .final_results(user_id, &mut pipeline)
        .await?;
    save_pipeline(&session, &pipeline).await?;

    Ok(Json(ApiResponse::success(FinalResponse {
        summary,
        session: SessionView::from(&pipeline),
    })))
}

/// POST /pipeline/report
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<ReportResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    let mut pipeline = load_pipeline(&session).await?;
    let report = state
        .analysis_service()
        .generate_report(user_id, &mut pipeline)
        .await?;
    save_pipeline(&session, &pipeline).await?;

    Ok(Json(ApiResponse::success(ReportResponse {
        report,
        session: SessionView::from(&pipeline),
    })))
}

/// GET /pipeline/annotations/{gene_id}?threshold=
pub async fn annotation_terms(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(gene_id): Path<String>,
    Query(query): Query<ThresholdQuery>,
) -> Result<Json<ApiResponse<Vec<GoTerm>>>, ApiError> {
    session_user(&session).await?;
    let gene_id = validate_gene_id(&gene_id)?;
    let threshold = validate_threshold(query.threshold.unwrap_or(DEFAULT_TERM_THRESHOLD))?;

    let pipeline = load_pipeline(&session).await?;
    let terms = state
        .analysis_service()
        .annotation_terms(&pipeline, gene_id, threshold)
        .await?;
    Ok(Json(ApiResponse::success(terms)))
}

/// GET /pipeline/models
pub async fn structure_models(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ModelInfo>>>, ApiError> {
    session_user(&session).await?;
    let pipeline = load_pipeline(&session).await?;
    let models = state
        .analysis_service()
        .structure_models(&pipeline)
        .await?;
    Ok(Json(ApiResponse::success(models)))
}
