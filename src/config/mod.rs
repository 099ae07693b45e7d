// Configuration management module
// TOML settings, per-bound validation, and base-directory resolution

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunker::SplitterConfig;
use crate::metadata::CategoryPalette;

/// Fallback credential used when `OPENAI_API_KEY` is unset. Requests made
/// with it fail at the provider with an auth error, which is the intended
/// surfacing of a missing key.
pub const API_KEY_PLACEHOLDER: &str = "your-key-if-not-using-env";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root directory of the knowledge base (one subfolder per category)
    pub knowledge_base: String,
    /// Name of the category palette used for tagging and visualization
    pub palette: String,
    pub openai: OpenAiConfig,
    pub splitter: SplitterConfig,
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Read once from the environment at load time, never persisted
    #[serde(skip)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved as context for each question
    pub top_k: usize,
    /// Optional fixed system instruction prepended to every prompt
    pub system_prompt: Option<String>,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            knowledge_base: "knowledge-base".to_string(),
            palette: "linkedin".to_string(),
            openai: OpenAiConfig::default(),
            splitter: SplitterConfig::default(),
            retrieval: RetrievalConfig::default(),
            base_dir: PathBuf::new(),
            api_key: API_KEY_PLACEHOLDER.to_string(),
        }
    }
}

impl Default for OpenAiConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            batch_size: 64,
            timeout_seconds: 30,
        }
    }
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 25,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be greater than 0)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    ChunkOverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be between 1 and 200)")]
    InvalidTopK(usize),
    #[error("Unknown palette: {0} (available: linkedin, career)")]
    UnknownPalette(String),
    #[error("Knowledge base path cannot be empty")]
    EmptyKnowledgeBase,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `config.toml` under `config_dir`, falling
    /// back to defaults when no file exists. The API credential is read
    /// from `OPENAI_API_KEY` here, once.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.base_dir = config_dir.as_ref().to_path_buf();
        config.api_key =
            std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| API_KEY_PLACEHOLDER.to_string());

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create config directory: {}", self.base_dir.display())
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.knowledge_base.trim().is_empty() {
            return Err(ConfigError::EmptyKnowledgeBase);
        }

        if CategoryPalette::by_name(&self.palette).is_none() {
            return Err(ConfigError::UnknownPalette(self.palette.clone()));
        }

        if self.splitter.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.splitter.chunk_size));
        }

        if self.splitter.chunk_overlap >= self.splitter.chunk_size {
            return Err(ConfigError::ChunkOverlapTooLarge(
                self.splitter.chunk_overlap,
                self.splitter.chunk_size,
            ));
        }

        if !(1..=200).contains(&self.retrieval.top_k) {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        self.openai.validate()
    }

    /// The configured palette as a value object
    #[inline]
    pub fn category_palette(&self) -> Result<CategoryPalette, ConfigError> {
        CategoryPalette::by_name(&self.palette)
            .ok_or_else(|| ConfigError::UnknownPalette(self.palette.clone()))
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Path of the on-disk vector store directory
    #[inline]
    pub fn vector_store_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }
}

impl OpenAiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    #[inline]
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("kb-chat"))
        .ok_or(ConfigError::DirectoryError)
}
