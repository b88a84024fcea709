use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::constants::session::USER_ID_KEY;
use crate::domain::UserId;
use crate::services::{Registration, UserInfo};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests without a logged-in session.
pub async fn auth_middleware(session: Session, request: Request, next: Next) -> impl IntoResponse {
    if let Ok(Some(user_id)) = session.get::<i32>(USER_ID_KEY).await {
        tracing::Span::current().record("user_id", user_id);
        return next.run(request).await;
    }

    let body = ApiResponse::<()>::error("Not authenticated");
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), ApiError> {
    let user = state.auth_service().register(&payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// POST /auth/login
/// Authenticate with email and password and start a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    // New id per login so a pre-login cookie cannot be reused
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(USER_ID_KEY, user.id.value())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!(user_id = user.id.value(), "User logged in");
    Ok(Json(ApiResponse::success(user)))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Json<ApiResponse<MessageResponse>> {
    if let Ok(Some(user_id)) = session.get::<i32>(USER_ID_KEY).await {
        state.auth_service().logout(UserId::new(user_id)).await;
    }
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user_id = session_user(&session).await?;
    let user = state.auth_service().get_user_info(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

// ============================================================================
// Helpers
// ============================================================================

/// Get the user id from the session, returns error if not authenticated
pub async fn session_user(session: &Session) -> Result<UserId, ApiError> {
    session
        .get::<i32>(USER_ID_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .map(UserId::new)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))
}
