//! Reasoning-engine types and errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasoning-engine errors
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("reasoning request failed: {0}")]
    Http(String),

    /// Error reported by the collaborator's top-level `error` field
    #[error("API 错误: {0}")]
    Api(String),

    /// Envelope had no choices or an empty message content
    #[error("API 返回了空的内容")]
    EmptyReply,

    /// Inner content was not the expected `{analysis, tags}` object
    #[error("解析模型响应失败: {0}")]
    MalformedReply(String),
}

/// Validated tagging output for one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagAnalysis {
    /// Ordered knowledge-point labels
    pub tags: Vec<String>,
    /// Free-form explanation
    pub analysis: String,
}
