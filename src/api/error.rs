use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

use super::ApiResponse;
use crate::services::{AnalysisError, AuthError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The message carries the tool diagnostic.
    #[error("Step failed: {0}")]
    StepFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::StepFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client. Server-side failures stay in the logs.
    fn client_message(self) -> String {
        match self {
            Self::DatabaseError(msg) => {
                tracing::error!(event = "database_error", error = %msg, "Request failed");
                "A database error occurred".to_string()
            }
            Self::InternalError(msg) => {
                tracing::error!(event = "internal_error", error = %msg, "Request failed");
                "An internal error occurred".to_string()
            }
            Self::StepFailed(msg) => {
                tracing::warn!(event = "step_failed", diagnostic = %msg, "Pipeline step failed");
                msg
            }
            Self::NotFound(msg) | Self::ValidationError(msg) | Self::Unauthorized(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()>::error(self.client_message());
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(msg) => Self::ValidationError(msg),
            AnalysisError::NotFound(_) => Self::NotFound(err.to_string()),
            AnalysisError::Step(e) => Self::StepFailed(e.to_string()),
            AnalysisError::Database(msg) => Self::DatabaseError(msg),
            AnalysisError::Internal(msg) => Self::InternalError(msg),
        }
    }
}
