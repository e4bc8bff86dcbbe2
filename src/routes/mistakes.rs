//! Mistake CRUD routes
//!
//! Endpoints:
//! - GET    /api/mistakes              - list all records, newest first
//! - POST   /api/mistakes              - create a text-only record
//! - PUT    /api/mistakes/:id          - update a record's content
//! - DELETE /api/mistakes/:id          - delete one record
//! - POST   /api/mistakes/batch-delete - delete many records by id

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Mistake, MistakeRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_mistakes).post(create_mistake))
        .route("/:id", put(update_mistake).delete(delete_mistake))
        .route("/batch-delete", post(batch_delete))
}

/// Record as the front end sees it: tags parsed to a list, empty when the
/// record has not been analyzed.
#[derive(Serialize)]
pub struct MistakeView {
    pub id: i64,
    pub content: String,
    pub image_path: Option<String>,
    pub created_at: String,
    pub tags: Vec<String>,
    pub analysis: Option<String>,
}

impl From<&Mistake> for MistakeView {
    fn from(m: &Mistake) -> Self {
        MistakeView {
            id: m.id,
            content: m.content.clone(),
            image_path: m.image_path.clone(),
            created_at: m.created_at.clone(),
            tags: m.tag_list(),
            analysis: m.analysis.clone(),
        }
    }
}

async fn list_mistakes(State(state): State<AppState>) -> Result<Json<Vec<MistakeView>>> {
    let repo = MistakeRepository::new(state.db());
    let mistakes = repo.list().await?;
    Ok(Json(mistakes.iter().map(MistakeView::from).collect()))
}

#[derive(Deserialize)]
struct CreateRequest {
    content: String,
}

#[derive(Serialize)]
struct CreateResponse {
    success: bool,
    id: i64,
    message: String,
}

async fn create_mistake(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> Result<Json<CreateResponse>> {
    if body.content.trim().is_empty() {
        return Err(AppError::BadRequest("内容不能为空".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    let mistake = repo.create(&body.content, None).await?;

    Ok(Json(CreateResponse {
        success: true,
        id: mistake.id,
        message: "添加成功".to_string(),
    }))
}

#[derive(Deserialize)]
struct UpdateRequest {
    content: String,
}

#[derive(Serialize)]
struct UpdateResponse {
    success: bool,
    mistake: MistakeView,
}

async fn update_mistake(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    if body.content.trim().is_empty() {
        return Err(AppError::BadRequest("内容不能为空".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    repo.get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("错题不存在".to_string()))?;

    // Tags and analysis are left as they were; see DESIGN.md
    let updated = repo
        .update_content(id, &body.content)
        .await?
        .ok_or_else(|| AppError::NotFound("错题不存在".to_string()))?;

    Ok(Json(UpdateResponse {
        success: true,
        mistake: MistakeView::from(&updated),
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn delete_mistake(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let repo = MistakeRepository::new(state.db());
    if !repo.delete(id).await? {
        return Err(AppError::NotFound("错题不存在".to_string()));
    }

    Ok(Json(DeleteResponse { success: true }))
}

#[derive(Deserialize)]
struct BatchDeleteRequest {
    mistake_ids: Vec<i64>,
}

#[derive(Serialize)]
struct BatchDeleteResponse {
    success: bool,
    message: String,
}

async fn batch_delete(
    State(state): State<AppState>,
    Json(body): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>> {
    if body.mistake_ids.is_empty() {
        return Err(AppError::BadRequest("没有选择错题".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    let removed = repo.delete_many(&body.mistake_ids).await?;

    tracing::info!(
        requested = body.mistake_ids.len(),
        removed,
        "Batch delete complete"
    );

    // Reports the count of ids requested, not rows removed
    Ok(Json(BatchDeleteResponse {
        success: true,
        message: format!("成功删除 {} 道错题", body.mistake_ids.len()),
    }))
}
