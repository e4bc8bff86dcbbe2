//! Export route
//!
//! POST /api/mistakes/export composes the selected records into a PDF and
//! returns it as a downloadable attachment with a timestamped filename.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::db::MistakeRepository;
use crate::error::{AppError, Result};
use crate::export::{export_pdf, ExportMode};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/export", post(export))
}

#[derive(Deserialize)]
struct ExportRequest {
    mistake_ids: Vec<i64>,
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "full".to_string()
}

async fn export(
    State(state): State<AppState>,
    Json(body): Json<ExportRequest>,
) -> Result<impl IntoResponse> {
    if body.mistake_ids.is_empty() {
        return Err(AppError::BadRequest("没有选择错题".to_string()));
    }

    let mode = ExportMode::parse(&body.mode)
        .ok_or_else(|| AppError::BadRequest("无效的导出模式".to_string()))?;

    let repo = MistakeRepository::new(state.db());
    let mistakes = repo.list_by_ids(&body.mistake_ids).await?;

    let pdf = export_pdf(&mistakes, mode)?;
    let filename = format!(
        "mistakes_export_{}.pdf",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );

    tracing::info!(
        records = mistakes.len(),
        mode = %body.mode,
        %filename,
        "Export complete"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    ))
}
