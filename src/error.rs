//! Error types for the Cuotiji server
//!
//! Every handler returns `AppError` and this module is the single place
//! where failures are mapped to HTTP responses. The JSON body shape is
//! `{error, detail}`; user-facing `error` messages for client mistakes keep
//! the original Chinese wording the front end displays verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;
use crate::reasoning::ReasoningError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Reasoning engine error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Image error: {0}")]
    Image(String),

    #[error("PDF export error: {0}")]
    Pdf(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Ocr(e) => {
                tracing::error!("OCR collaborator failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "识别失败".to_string())
            }
            AppError::Reasoning(e) => {
                tracing::error!("Reasoning collaborator failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "分析失败".to_string())
            }
            AppError::Image(e) => {
                tracing::error!("Image processing failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "图片处理失败".to_string())
            }
            AppError::Pdf(e) => {
                tracing::error!("PDF export failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "导出失败".to_string())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "数据库操作失败".to_string())
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "文件保存失败".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error,
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}
