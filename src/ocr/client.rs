//! Baidu OCR HTTP client
//!
//! Two recognition modes are used: `general_basic` for plain text extraction
//! on upload, and `accurate` (with probabilities) for the handwriting
//! whiteout pass. Access tokens come from the OAuth client-credentials flow
//! and are cached until shortly before expiry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::types::{OcrError, Region, TextRegion};
use crate::config::OcrConfig;

/// OCR engine seam
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text fragments in reading order
    async fn recognize_basic(&self, image: &[u8]) -> Result<Vec<String>, OcrError>;

    /// Recognize fragments with confidence and bounding box
    async fn recognize_accurate(&self, image: &[u8]) -> Result<Vec<TextRegion>, OcrError>;
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Baidu OCR client
pub struct BaiduOcr {
    http: reqwest::Client,
    config: OcrConfig,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenReply {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct RecognizeReply {
    error_code: Option<i64>,
    error_msg: Option<String>,
    words_result: Option<Vec<WordsItem>>,
}

#[derive(Deserialize)]
struct WordsItem {
    words: String,
    location: Option<Location>,
    probability: Option<Probability>,
}

#[derive(Deserialize)]
struct Location {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct Probability {
    average: f64,
}

impl BaiduOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    /// Fetch or reuse a cached access token
    async fn access_token(&self) -> Result<String, OcrError> {
        let mut cached = self.token.lock().await;
        if let Some(ref entry) = *cached {
            if entry.expires_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let url = format!("{}/oauth/2.0/token", self.config.endpoint);
        let reply: TokenReply = self
            .http
            .post(&url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.api_key.as_str()),
                ("client_secret", self.config.secret_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OcrError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| OcrError::MalformedReply(e.to_string()))?;

        let token = reply.access_token.ok_or_else(|| {
            OcrError::Auth(
                reply
                    .error_description
                    .unwrap_or_else(|| "no access_token in reply".to_string()),
            )
        })?;

        // Refresh a minute early so an in-flight call never hits expiry
        let ttl = reply.expires_in.unwrap_or(2_592_000).saturating_sub(60);
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        Ok(token)
    }

    async fn recognize(&self, mode: &str, form: &[(&str, String)]) -> Result<Vec<WordsItem>, OcrError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/rest/2.0/ocr/v1/{}?access_token={}",
            self.config.endpoint, mode, token
        );

        let reply: RecognizeReply = self
            .http
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| OcrError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| OcrError::MalformedReply(e.to_string()))?;

        if let Some(code) = reply.error_code {
            return Err(OcrError::Api {
                code,
                message: reply.error_msg.unwrap_or_else(|| "未知错误".to_string()),
            });
        }

        reply
            .words_result
            .ok_or_else(|| OcrError::MalformedReply("reply has no words_result".to_string()))
    }
}

#[async_trait]
impl OcrEngine for BaiduOcr {
    async fn recognize_basic(&self, image: &[u8]) -> Result<Vec<String>, OcrError> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image);
        let items = self
            .recognize("general_basic", &[("image", image_b64)])
            .await?;

        tracing::debug!(fragments = items.len(), "OCR basic recognition complete");
        Ok(items.into_iter().map(|item| item.words).collect())
    }

    async fn recognize_accurate(&self, image: &[u8]) -> Result<Vec<TextRegion>, OcrError> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image);
        let items = self
            .recognize(
                "accurate",
                &[("image", image_b64), ("probability", "true".to_string())],
            )
            .await?;

        let regions = items
            .into_iter()
            .filter_map(|item| {
                let location = item.location?;
                Some(TextRegion {
                    words: item.words,
                    // Fragments without a probability are treated as certain
                    confidence: item.probability.map(|p| p.average).unwrap_or(1.0),
                    region: Region {
                        left: location.left,
                        top: location.top,
                        width: location.width,
                        height: location.height,
                    },
                })
            })
            .collect();

        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognize_reply_parses_accurate_shape() {
        let raw = r#"{
            "words_result": [
                {
                    "words": "1 + 1 = 2",
                    "location": {"left": 10, "top": 20, "width": 120, "height": 30},
                    "probability": {"average": 0.97, "min": 0.91, "variance": 0.001}
                }
            ],
            "words_result_num": 1
        }"#;

        let reply: RecognizeReply = serde_json::from_str(raw).unwrap();
        let items = reply.words_result.unwrap();
        assert_eq!(items[0].words, "1 + 1 = 2");
        assert_eq!(items[0].probability.as_ref().unwrap().average, 0.97);
        assert_eq!(items[0].location.as_ref().unwrap().left, 10);
    }

    #[test]
    fn recognize_reply_parses_error_shape() {
        let raw = r#"{"error_code": 17, "error_msg": "Open api daily request limit reached"}"#;
        let reply: RecognizeReply = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.error_code, Some(17));
    }
}
