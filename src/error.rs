use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::plans::{services::PlanError, week::WeekOutOfRange};

/// Error returned by every handler. Renders as `{ "error": "..." }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "request failed");
                "server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        if let PlanError::InvalidMeal { day, slot, value } = &e {
            warn!(%day, %slot, %value, "rejected meal selection");
        }
        match e {
            PlanError::Storage(inner) => AppError::Internal(inner.into()),
            invalid => AppError::BadRequest(invalid.to_string()),
        }
    }
}

impl From<WeekOutOfRange> for AppError {
    fn from(e: WeekOutOfRange) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
