use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::session_user;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::UserInfo;

#[derive(Deserialize)]
pub struct UsernameRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct PhotoRequest {
    /// Base64 encoded image.
    pub photo: String,
}

/// PUT /account/username
pub async fn update_username(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<UsernameRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user_id = session_user(&session).await?;
    let user = state
        .auth_service()
        .update_username(user_id, &payload.username)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /account/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;

    state
        .auth_service()
        .change_password(
            user_id,
            &payload.current_password,
            &payload.new_password,
            &payload.confirm_password,
        )
        .await?;

    tracing::info!(user_id = user_id.value(), "Password changed");
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}

/// PUT /account/photo
pub async fn set_photo(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<PhotoRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    state
        .auth_service()
        .set_profile_photo(user_id, &payload.photo)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Profile photo updated",
    ))))
}

/// DELETE /account/photo
pub async fn remove_photo(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    state.auth_service().remove_profile_photo(user_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Profile photo removed",
    ))))
}

/// POST /account/deactivate
/// Soft-deactivate the account and end the session
pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user_id = session_user(&session).await?;
    state.auth_service().deactivate(user_id).await?;
    let _ = session.flush().await;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Account deactivated",
    ))))
}
