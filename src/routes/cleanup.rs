//! Image-cleanup route
//!
//! POST /api/process-image runs accurate OCR over an uploaded image and
//! whites out every region whose confidence falls below the handwriting
//! threshold, returning the edited PNG. Nothing is stored.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Router,
};

use crate::error::{AppError, Result};
use crate::imaging;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/process-image", post(process_image))
}

async fn process_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("上传数据无效: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        if filename.is_empty() {
            return Err(AppError::BadRequest("没有选择文件".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("上传数据无效: {}", e)))?;
        upload = Some(data.to_vec());
        break;
    }

    let data = upload.ok_or_else(|| AppError::BadRequest("没有上传文件".to_string()))?;

    let regions = state.ocr().recognize_accurate(&data).await?;
    tracing::debug!(regions = regions.len(), "Accurate OCR complete");

    let cleaned = imaging::whiteout_low_confidence(&data, &regions)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], cleaned))
}
