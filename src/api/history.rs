use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::session_user;
use super::validation::{parse_date, validate_date_range, validate_limit, validate_record_id};
use super::{ApiError, ApiResponse, AppState, MessageResponse, SequenceSummaryDto};
use crate::db::{ActionCount, ActivityEntry, HistoryQuery};
use crate::services::UsageSummary;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Comma separated action types.
    pub action_types: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let user_id = session_user(&session).await?;

    let (start_date, end_date) = validate_date_range(
        parse_date(params.start_date.as_deref(), "start_date")?,
        parse_date(params.end_date.as_deref(), "end_date")?,
    )?;
    let limit = params.limit.map(validate_limit).transpose()?.unwrap_or(0);

    let action_types = params
        .action_types
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let query = HistoryQuery {
        action_types,
        search: params.search.filter(|s| !s.trim().is_empty()),
        start_date,
        end_date,
        limit,
    };

    let entries = state.history_service().history(user_id, query).await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// DELETE /history/{id}
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    let id = validate_record_id(id)?;

    if !state.history_service().delete_entry(user_id, id).await? {
        return Err(ApiError::not_found("History entry", id));
    }
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "History entry deleted",
    ))))
}

/// GET /history/stats
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<ActionCount>>>, ApiError> {
    let user_id = session_user(&session).await?;
    let counts = state.history_service().statistics(user_id).await?;
    Ok(Json(ApiResponse::success(counts)))
}

/// GET /history/summary
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UsageSummary>>, ApiError> {
    let user_id = session_user(&session).await?;
    let summary = state.history_service().usage_summary(user_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// GET /history/analyzed
pub async fn get_analyzed(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(params): Query<RangeParams>,
) -> Result<Json<ApiResponse<Vec<SequenceSummaryDto>>>, ApiError> {
    let user_id = session_user(&session).await?;
    let (start_date, end_date) = validate_date_range(
        parse_date(params.start_date.as_deref(), "start_date")?,
        parse_date(params.end_date.as_deref(), "end_date")?,
    )?;

    let sequences = state
        .history_service()
        .analyzed_sequences(user_id, start_date, end_date)
        .await?;
    Ok(Json(ApiResponse::success(
        sequences.into_iter().map(SequenceSummaryDto::from).collect(),
    )))
}
