use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::session_user;
use super::{ApiError, AppState};

/// GET /reports/{id}/download
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let user_id = session_user(&session).await?;
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid report ID: {id}. ID must be a positive integer"
        )));
    }

    let report = state
        .analysis_service()
        .download_report(user_id, id)
        .await?;

    let content_type = HeaderValue::from_str(&report.content_type)
        .map_err(|e| ApiError::internal(format!("Invalid content type: {e}")))?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        report.file_name.replace('"', "")
    ))
    .map_err(|e| ApiError::internal(format!("Invalid file name: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.body,
    )
        .into_response())
}
