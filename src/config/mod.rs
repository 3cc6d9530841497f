use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub interview: InterviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on request bodies; video answers arrive as multipart uploads.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    /// Base URL for resumable File API uploads.
    pub upload_endpoint: String,
    pub model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub temperature: f32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_seconds: u64,
    /// Clips whose encoded request would exceed this go through the File API.
    pub max_inline_request_bytes: usize,
    pub file_poll_interval_ms: u64,
    /// Generate a spoken greeting alongside the introduction.
    pub greeting_audio: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub min_questions: usize,
    pub max_questions: usize,
    /// When false, a second interview cannot start while one is active.
    pub allow_concurrent_sessions: bool,
    /// Sessions kept in memory; the oldest finished ones are dropped first.
    pub max_retained_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            upload_endpoint: "https://generativelanguage.googleapis.com/upload/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            tts_voice: "Kore".to_string(),
            temperature: 0.7,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            request_timeout_seconds: 120,
            max_inline_request_bytes: 20_000_000,
            file_poll_interval_ms: 2000,
            greeting_audio: true,
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            min_questions: 5,
            max_questions: 7,
            allow_concurrent_sessions: false,
            max_retained_sessions: 20,
        }
    }
}

impl GeminiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn file_poll_interval(&self) -> Duration {
        Duration::from_millis(self.file_poll_interval_ms)
    }

    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let key = std::env::var(&self.api_key_env).with_context(|| {
            format!(
                "{} environment variable not found. Set the key and restart.",
                self.api_key_env
            )
        })?;

        if key.trim().is_empty() {
            anyhow::bail!("{} environment variable is empty", self.api_key_env);
        }

        Ok(key)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads `config_path`, writing the defaults there first if it is missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
