//! Route modules for the Cuotiji server

pub mod analyze;
pub mod cleanup;
pub mod export;
pub mod mistakes;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_bytes = state.config().upload.max_bytes;

    let api = Router::new()
        .merge(upload::router())
        .merge(cleanup::router())
        .nest(
            "/mistakes",
            mistakes::router()
                .merge(analyze::router())
                .merge(export::router()),
        );

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
