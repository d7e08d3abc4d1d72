use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use voxtask_core::SyncError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Failures a handler reports to the caller with a specific status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("Status=404, NotFound: {0}")]
    NotFound(String),

    #[error("Status=403, Forbidden: {0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn task_not_found() -> Self {
        Self::NotFound("Task not found".to_string())
    }

    pub fn quota_exceeded() -> Self {
        Self::Forbidden("Task quota exceeded".to_string())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ServerError::Api(e) => {
                tracing::warn!("{}", e);
                match e {
                    ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
                    ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, detail),
                }
            }
            ServerError::Sync(e) => {
                tracing::warn!("Rejected input: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ServerError::Io(e) => {
                tracing::error!(%e, "Unexpected server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected Error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
