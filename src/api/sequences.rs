use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::session_user;
use super::pipeline::{load_pipeline, save_pipeline};
use super::validation::{
    parse_date, parse_status, validate_date_range, validate_limit, validate_sequence_id,
};
use super::{ApiError, ApiResponse, AppState, MessageResponse, SequenceSummaryDto};
use crate::constants::limits::DEFAULT_SEQUENCE_LIMIT;
use crate::db::{AnalysisResult, ReportRecord, SequenceQuery, SequenceRecord};
use crate::pipeline::PipelineSession;

#[derive(Debug, Deserialize)]
pub struct SequenceListQuery {
    pub limit: Option<u64>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /sequences
pub async fn list_sequences(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<SequenceListQuery>,
) -> Result<Json<ApiResponse<Vec<SequenceSummaryDto>>>, ApiError> {
    let user_id = session_user(&session).await?;

    let limit = validate_limit(params.limit.unwrap_or(DEFAULT_SEQUENCE_LIMIT))?;
    let status = parse_status(params.status.as_deref())?;
    let (start_date, end_date) = validate_date_range(
        parse_date(params.start_date.as_deref(), "start_date")?,
        parse_date(params.end_date.as_deref(), "end_date")?,
    )?;

    let query = SequenceQuery {
        limit: Some(limit),
        statuses: status.into_iter().collect(),
        start_date,
        end_date,
    };

    let sequences = state
        .analysis_service()
        .list_sequences(user_id, &query)
        .await?;

    Ok(Json(ApiResponse::success(
        sequences.into_iter().map(SequenceSummaryDto::from).collect(),
    )))
}

/// GET /sequences/{id}
pub async fn get_sequence(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SequenceRecord>>, ApiError> {
    let user_id = session_user(&session).await?;
    let sequence_id = validate_sequence_id(id)?;
    let sequence = state
        .analysis_service()
        .get_sequence(user_id, sequence_id)
        .await?;
    Ok(Json(ApiResponse::success(sequence)))
}

/// GET /sequences/{id}/results
pub async fn get_results(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AnalysisResult>>>, ApiError> {
    let user_id = session_user(&session).await?;
    let sequence_id = validate_sequence_id(id)?;
    let results = state
        .analysis_service()
        .sequence_results(user_id, sequence_id)
        .await?;
    Ok(Json(ApiResponse::success(results)))
}

/// GET /sequences/{id}/reports
pub async fn get_reports(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ReportRecord>>>, ApiError> {
    let user_id = session_user(&session).await?;
    let sequence_id = validate_sequence_id(id)?;
    let reports = state
        .analysis_service()
        .sequence_reports(user_id, sequence_id)
        .await?;
    Ok(Json(ApiResponse::success(reports)))
}

/// DELETE /sequences/{id}
/// Deletes the sequence with everything derived from it. A session attached
/// to it starts over.
pub async fn delete_sequence(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    let sequence_id = validate_sequence_id(id)?;

    state
        .analysis_service()
        .delete_sequence(user_id, sequence_id)
        .await?;

    let pipeline = load_pipeline(&session).await?;
    if pipeline.sequence_id() == Some(sequence_id) {
        save_pipeline(&session, &PipelineSession::new()).await?;
    }

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Sequence {sequence_id} deleted"
    )))))
}
