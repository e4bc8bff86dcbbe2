//! Application state management
//!
//! Collaborator clients are constructed once at startup and injected here;
//! handlers only ever see the trait objects, so tests swap in mocks.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::ocr::OcrEngine;
use crate::reasoning::ReasoningEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    ocr: Arc<dyn OcrEngine>,
    reasoning: Arc<dyn ReasoningEngine>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: SqlitePool,
        ocr: Arc<dyn OcrEngine>,
        reasoning: Arc<dyn ReasoningEngine>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                ocr,
                reasoning,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn ocr(&self) -> &dyn OcrEngine {
        self.inner.ocr.as_ref()
    }

    pub fn reasoning(&self) -> &dyn ReasoningEngine {
        self.inner.reasoning.as_ref()
    }
}
