//! Knowledge-tagging route
//!
//! POST /api/mistakes/analyze sends each selected record's text to the
//! reasoning collaborator and persists the returned tags and analysis.
//! Records that already carry both are skipped unless `refresh` is set, so
//! repeated calls never re-bill the collaborator for the same question.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::MistakeRepository;
use crate::error::{AppError, Result};
use crate::reasoning::ReasoningError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    mistake_ids: Vec<i64>,
    #[serde(default)]
    refresh: bool,
}

#[derive(Serialize)]
struct AnalyzeResult {
    id: i64,
    tags: Vec<String>,
    analysis: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    message: String,
    results: Vec<AnalyzeResult>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    if body.mistake_ids.is_empty() {
        return Err(AppError::BadRequest("没有选择错题".to_string()));
    }

    let repo = MistakeRepository::new(state.db());
    let mut results = Vec::new();

    for &id in &body.mistake_ids {
        let Some(mistake) = repo.get(id).await? else {
            tracing::warn!(id, "Skipping unknown mistake id in analyze request");
            continue;
        };

        if mistake.is_analyzed() && !body.refresh {
            results.push(AnalyzeResult {
                id: mistake.id,
                tags: mistake.tag_list(),
                analysis: mistake.analysis.clone().unwrap_or_default(),
            });
            continue;
        }

        // A collaborator failure aborts the whole request; records already
        // written in this loop stay committed
        let reply = state.reasoning().analyze(&mistake.content).await?;

        let tags_json = serde_json::to_string(&reply.tags)
            .map_err(|e| ReasoningError::MalformedReply(e.to_string()))?;
        repo.set_analysis(mistake.id, &tags_json, &reply.analysis)
            .await?;

        tracing::info!(id = mistake.id, tags = ?reply.tags, "Mistake analyzed");

        results.push(AnalyzeResult {
            id: mistake.id,
            tags: reply.tags,
            analysis: reply.analysis,
        });
    }

    let message = format!("成功分析 {} 道题目", results.len());
    Ok(Json(AnalyzeResponse {
        success: true,
        message,
        results,
    }))
}
