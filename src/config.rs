//! Configuration management for the Cuotiji server

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
    pub ocr: OcrConfig,
    pub reasoning: ReasoningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory where uploaded source images are kept.
    pub dir: String,
    /// Request body cap in bytes.
    pub max_bytes: usize,
}

/// Credentials for the Baidu OCR collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub app_id: String,
    pub api_key: String,
    pub secret_key: String,
    /// Override for tests pointing at a local fake.
    pub endpoint: String,
}

/// Credentials for the DeepSeek reasoning collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite:./cuotiji.db".to_string(),
            },
            upload: UploadConfig {
                dir: "uploads".to_string(),
                max_bytes: DEFAULT_MAX_BYTES,
            },
            ocr: OcrConfig {
                app_id: String::new(),
                api_key: String::new(),
                secret_key: String::new(),
                endpoint: "https://aip.baidubce.com".to_string(),
            },
            reasoning: ReasoningConfig {
                api_key: String::new(),
                endpoint: "https://api.deepseek.com".to_string(),
                model: "deepseek-chat".to_string(),
            },
        }
    }
}

impl Config {
    /// Read configuration from the environment; every knob has a default,
    /// so a bare environment yields the same thing as `Config::default()`.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .unwrap_or(5000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            upload: UploadConfig {
                dir: env::var("UPLOAD_DIR").unwrap_or(defaults.upload.dir),
                max_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_BYTES),
            },
            ocr: OcrConfig {
                app_id: env::var("BAIDU_APP_ID").unwrap_or_default(),
                api_key: env::var("BAIDU_API_KEY").unwrap_or_default(),
                secret_key: env::var("BAIDU_SECRET_KEY").unwrap_or_default(),
                endpoint: env::var("BAIDU_OCR_ENDPOINT").unwrap_or(defaults.ocr.endpoint),
            },
            reasoning: ReasoningConfig {
                api_key: env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
                endpoint: env::var("DEEPSEEK_ENDPOINT").unwrap_or(defaults.reasoning.endpoint),
                model: env::var("DEEPSEEK_MODEL").unwrap_or(defaults.reasoning.model),
            },
        }
    }
}
