//! DeepSeek chat-completion client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::types::{ReasoningError, TagAnalysis};
use crate::config::ReasoningConfig;

/// Reasoning engine seam
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Derive tags and an explanation for one question's text
    async fn analyze(&self, content: &str) -> Result<TagAnalysis, ReasoningError>;
}

/// Fixed instruction defining the expected JSON reply shape
const SYSTEM_PROMPT: &str = "你是一个教育专家。请分析题目并提取知识点，以 JSON 格式输出。输出应包含以下字段：
- tags: 知识点标签数组
- analysis: 详细分析

示例输出：
{
    \"tags\": [\"代数\", \"一元二次方程\", \"因式分解\"],
    \"analysis\": \"这道题目涉及一元二次方程的求解，需要使用因式分解方法...\"
}";

/// DeepSeek chat-completion client
pub struct DeepSeekClient {
    http: reqwest::Client,
    config: ReasoningConfig,
}

#[derive(Deserialize)]
struct CompletionReply {
    error: Option<serde_json::Value>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: String,
}

impl DeepSeekClient {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Parse the inner JSON-encoded content of a completion reply
    fn parse_inner(content: &str) -> Result<TagAnalysis, ReasoningError> {
        if content.trim().is_empty() {
            return Err(ReasoningError::EmptyReply);
        }
        serde_json::from_str(content).map_err(|e| ReasoningError::MalformedReply(e.to_string()))
    }
}

#[async_trait]
impl ReasoningEngine for DeepSeekClient {
    async fn analyze(&self, content: &str) -> Result<TagAnalysis, ReasoningError> {
        let url = format!("{}/v1/chat/completions", self.config.endpoint);

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("请分析以下题目：\n{}", content)}
            ],
            "temperature": 0.2,
            "response_format": {"type": "json_object"},
            // Keeps the inner JSON from being truncated mid-object
            "max_tokens": 2000
        });

        let reply: CompletionReply = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasoningError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| ReasoningError::MalformedReply(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(ReasoningError::Api(error.to_string()));
        }

        let choice = reply.choices.first().ok_or(ReasoningError::EmptyReply)?;
        Self::parse_inner(&choice.message.content)
    }
}
