//! OCR types and errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OCR errors
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    Http(String),

    #[error("OCR authentication failed: {0}")]
    Auth(String),

    /// Error reported by the collaborator itself (error_code/error_msg)
    #[error("OCR错误 {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Malformed OCR reply: {0}")]
    MalformedReply(String),
}

/// Pixel-space bounding box of a recognized fragment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// One recognized fragment from accurate mode, with its average confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    pub words: String,
    pub confidence: f64,
    pub region: Region,
}
