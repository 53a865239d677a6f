use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum MergingtonError {
    #[error("Activity not found")]
    ActivityNotFound,

    #[error("Activity already exists")]
    ActivityExists,

    #[error("Student is already signed up")]
    AlreadySignedUp,

    #[error("Activity is full")]
    ActivityFull,

    #[error("Student is not signed up for this activity")]
    NotSignedUp,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl MergingtonError {
    pub fn status(&self) -> StatusCode {
        match self {
            MergingtonError::ActivityNotFound => StatusCode::NOT_FOUND,
            MergingtonError::ActivityExists
            | MergingtonError::AlreadySignedUp
            | MergingtonError::ActivityFull
            | MergingtonError::NotSignedUp => StatusCode::BAD_REQUEST,
            MergingtonError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MergingtonError::RactorError(_) | MergingtonError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MergingtonError::ActivityNotFound => "ACTIVITY_NOT_FOUND",
            MergingtonError::ActivityExists => "ACTIVITY_EXISTS",
            MergingtonError::AlreadySignedUp => "ALREADY_SIGNED_UP",
            MergingtonError::ActivityFull => "ACTIVITY_FULL",
            MergingtonError::NotSignedUp => "NOT_SIGNED_UP",
            MergingtonError::InvalidRequest(_) => "INVALID_REQUEST",
            MergingtonError::RactorError(_) | MergingtonError::DatabaseError(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

/// True when the store rejected a write because of a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl IntoResponse for MergingtonError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            MergingtonError::RactorError(_) | MergingtonError::DatabaseError(_) => {
                error!(error = %self, "request failed with internal error");
                "An internal server error occurred.".to_string()
            }
            _ => self.to_string(),
        };
        let body = ApiErrorBody {
            inner: ApiErrorObject {
                code: self.code().to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
