//! Upload route
//!
//! POST /api/upload accepts either a JSON body `{text}` or a multipart form
//! with an `image` field. Image uploads are saved to the upload directory,
//! HEIF files are converted to PNG, and the bytes go to the OCR collaborator;
//! the newline-joined fragments become the record's content.

use std::path::Path;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::MistakeRepository;
use crate::error::{AppError, Result};
use crate::imaging;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload))
}

#[derive(Deserialize)]
struct UploadTextRequest {
    text: String,
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Dispatch on content type: multipart carries an image, anything else is
/// expected to be the JSON text body.
async fn upload(State(state): State<AppState>, req: Request) -> Result<Json<UploadResponse>> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|_| AppError::BadRequest("没有上传文件".to_string()))?;
        upload_image(state, multipart).await
    } else {
        let Json(body) = Json::<UploadTextRequest>::from_request(req, &())
            .await
            .map_err(|_| AppError::BadRequest("请求格式错误".to_string()))?;
        upload_text(state, body).await
    }
}

async fn upload_text(state: AppState, body: UploadTextRequest) -> Result<Json<UploadResponse>> {
    if body.text.trim().is_empty() {
        return Err(AppError::BadRequest("内容不能为空".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    let mistake = repo.create(&body.text, None).await?;

    tracing::info!(id = mistake.id, "Created text-only mistake");

    Ok(Json(UploadResponse {
        success: true,
        id: mistake.id,
        text: None,
    }))
}

async fn upload_image(state: AppState, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

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
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) = upload.ok_or_else(|| AppError::BadRequest("没有上传文件".to_string()))?;

    // Strip any path components a client might smuggle in
    let filename = Path::new(&filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::BadRequest("没有选择文件".to_string()))?
        .to_string();

    let save_path = Path::new(&state.config().upload.dir).join(&filename);
    tokio::fs::write(&save_path, &data).await?;
    let image_path = save_path.display().to_string();

    // HEIF phone photos are re-encoded before OCR; a decode failure stops
    // here, before any collaborator call or row insert
    let ocr_input = if imaging::is_heif(&filename) {
        imaging::convert_heif_to_png(&data)?
    } else {
        data
    };

    let fragments = state.ocr().recognize_basic(&ocr_input).await?;
    let text = fragments.join("\n");
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("未识别到文字".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    let mistake = repo.create(&text, Some(&image_path)).await?;

    tracing::info!(
        id = mistake.id,
        image = %image_path,
        fragments = fragments.len(),
        "Created mistake from OCR upload"
    );

    Ok(Json(UploadResponse {
        success: true,
        id: mistake.id,
        text: Some(text),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{
        multipart_body, spawn_app, spawn_default_app, MockOcr, MockReasoning,
    };
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 255, 255, 255]));
        let mut buffer = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .unwrap();
        buffer
    }

    #[tokio::test]
    async fn text_upload_creates_record() {
        let app = spawn_default_app().await;

        let response = app
            .server
            .post("/api/upload")
            .json(&json!({"text": "2+2=?"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["id"], 1);

        let list: Value = app.server.get("/api/mistakes").await.json();
        assert_eq!(list[0]["content"], "2+2=?");
        assert_eq!(list[0]["image_path"], Value::Null);
        assert_eq!(list[0]["tags"], json!([]));
        assert_eq!(list[0]["analysis"], Value::Null);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let app = spawn_default_app().await;

        let response = app
            .server
            .post("/api/upload")
            .json(&json!({"text": "   "}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let list: Value = app.server.get("/api/mistakes").await.json();
        assert_eq!(list.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn image_upload_stores_joined_fragments() {
        let ocr = MockOcr {
            lines: vec!["第一行".to_string(), "第二行".to_string()],
            ..MockOcr::default()
        };
        let app = spawn_app(ocr, MockReasoning::default()).await;

        let (content_type, body) = multipart_body("image", Some("q.png"), &png_bytes());
        let response = app
            .server
            .post("/api/upload")
            .content_type(&content_type)
            .bytes(body.into())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["text"], "第一行\n第二行");

        let list: Value = app.server.get("/api/mistakes").await.json();
        assert_eq!(list[0]["content"], "第一行\n第二行");
        assert!(list[0]["image_path"].as_str().unwrap().ends_with("q.png"));
    }

    #[tokio::test]
    async fn empty_filename_is_rejected_before_any_write() {
        let app = spawn_default_app().await;

        let (content_type, body) = multipart_body("image", Some(""), &png_bytes());
        let response = app
            .server
            .post("/api/upload")
            .content_type(&content_type)
            .bytes(body.into())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(app.ocr.calls.load(Ordering::SeqCst), 0);

        let list: Value = app.server.get("/api/mistakes").await.json();
        assert_eq!(list.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn missing_image_field_is_rejected() {
        let app = spawn_default_app().await;

        let (content_type, body) = multipart_body("attachment", Some("q.png"), &png_bytes());
        let response = app
            .server
            .post("/api/upload")
            .content_type(&content_type)
            .bytes(body.into())
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn undecodable_heif_never_reaches_ocr() {
        let app = spawn_default_app().await;

        let (content_type, body) = multipart_body("image", Some("photo.heic"), &[0u8; 16]);
        let response = app
            .server
            .post("/api/upload")
            .content_type(&content_type)
            .bytes(body.into())
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.ocr.calls.load(Ordering::SeqCst), 0);

        let list: Value = app.server.get("/api/mistakes").await.json();
        assert_eq!(list.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn ocr_error_code_surfaces_as_server_error() {
        let ocr = MockOcr {
            error_code: Some((17, "daily limit reached".to_string())),
            ..MockOcr::default()
        };
        let app = spawn_app(ocr, MockReasoning::default()).await;

        let (content_type, body) = multipart_body("image", Some("q.png"), &png_bytes());
        let response = app
            .server
            .post("/api/upload")
            .content_type(&content_type)
            .bytes(body.into())
            .await;

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("daily limit reached"));
    }
}
