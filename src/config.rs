use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transcription backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI Whisper API.
    #[default]
    Cloud,
    /// Local whisper.cpp binary.
    Local,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Cloud => write!(f, "cloud"),
            Backend::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud" => Ok(Backend::Cloud),
            "local" => Ok(Backend::Local),
            _ => Err(format!("Unknown backend: {}. Use 'cloud' or 'local'", s)),
        }
    }
}

/// Per-unit pricing for cost estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    /// Whisper API price per audio minute (USD).
    pub whisper_per_minute: f64,
    /// Chat completion price per 1000 tokens (USD).
    pub chat_per_1k_tokens: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            whisper_per_minute: 0.006,
            chat_per_1k_tokens: 0.002,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub backend: Backend,
    /// Cloud transcription model identifier.
    pub whisper_model: String,
    /// Path to the whisper.cpp binary (local backend).
    pub local_whisper_bin: Option<PathBuf>,
    /// Path to the ggml model file (local backend).
    pub local_whisper_model: Option<PathBuf>,
    /// Chat model used for summarization.
    pub chat_model: String,
    pub pricing: Pricing,
    pub watched_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    /// Sentence count for the brief summary.
    pub brief_sentences: usize,
    /// Token threshold for transcript chunking.
    pub token_threshold: usize,
    /// Seconds between directory scans.
    pub poll_interval_secs: u64,
    /// Seconds between upload-settle size checks.
    pub settle_interval_secs: u64,
    /// File extension the watch loop picks up.
    pub watch_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            backend: Backend::default(),
            whisper_model: "whisper-1".to_string(),
            local_whisper_bin: None,
            local_whisper_model: None,
            chat_model: "gpt-3.5-turbo".to_string(),
            pricing: Pricing::default(),
            watched_dir: None,
            processed_dir: None,
            brief_sentences: 10,
            token_threshold: 3000,
            poll_interval_secs: 5,
            settle_interval_secs: 2,
            watch_extension: "mp3".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: file first, environment variables override.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str(&contents)
                    .map_err(|e| ScribeError::Config(format!("Bad config file: {e}")))?;
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(dir) = std::env::var("WATCHED_DIR") {
            config.watched_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("PROCESSED_DIR") {
            config.processed_dir = Some(PathBuf::from(dir));
        }
        if let Ok(backend) = std::env::var("SCRIBEWATCH_BACKEND") {
            if let Ok(b) = backend.parse() {
                config.backend = b;
            }
        }
        if let Ok(price) = std::env::var("OPENAI_PRICING_WHISPER") {
            if let Ok(p) = price.parse() {
                config.pricing.whisper_per_minute = p;
            }
        }
        if let Ok(price) = std::env::var("OPENAI_PRICING_CHAT") {
            if let Ok(p) = price.parse() {
                config.pricing.chat_per_1k_tokens = p;
            }
        }

        Ok(config)
    }

    /// Fail fast on anything the selected backend cannot run without.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            Backend::Cloud => {
                if self.openai_api_key.is_none() {
                    return Err(ScribeError::Config(
                        "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                            .to_string(),
                    ));
                }
            }
            Backend::Local => {
                if self.local_whisper_bin.is_none() || self.local_whisper_model.is_none() {
                    return Err(ScribeError::Config(
                        "Local backend needs local_whisper_bin and local_whisper_model"
                            .to_string(),
                    ));
                }
                // Summarization still goes through the chat API.
                if self.openai_api_key.is_none() {
                    return Err(ScribeError::Config(
                        "OPENAI_API_KEY not set (required for summarization)".to_string(),
                    ));
                }
            }
        }

        if self.watched_dir.is_none() {
            return Err(ScribeError::Config(
                "watched_dir not set (config file or WATCHED_DIR)".to_string(),
            ));
        }
        if self.processed_dir.is_none() {
            return Err(ScribeError::Config(
                "processed_dir not set (config file or PROCESSED_DIR)".to_string(),
            ));
        }
        if self.token_threshold == 0 {
            return Err(ScribeError::Config(
                "token_threshold must be greater than 0".to_string(),
            ));
        }
        if self.brief_sentences == 0 {
            return Err(ScribeError::Config(
                "brief_sentences must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scribewatch").join("config.toml"))
    }
}
