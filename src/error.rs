use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure to turn a source into an `ImportResult`. Always fatal.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Workbook not found: {0}")]
    NotFound(String),
    #[error("Failed to open workbook: {0}")]
    Open(String),
    #[error("Failed to read worksheet {sheet}: {message}")]
    Sheet { sheet: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("File processing error: {0}")]
    FileProcessing(String),
    #[error("Download error: {0}")]
    Download(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::FileProcessing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Import(ImportError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Download(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
