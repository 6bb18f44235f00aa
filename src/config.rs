//! Application configuration.
//!
//! Loaded from TOML at `$XDG_CONFIG_HOME/listing-search/config.toml` (or the
//! platform config dir), then overridden by `LSEARCH_*` environment variables.
//! A missing file yields defaults.
//!
//! ```toml
//! [embedding]
//! provider = "openai"
//! dimension = 1536
//!
//! [rerank]
//! provider = "jina"
//! threshold = 0.3
//!
//! [fusion]
//! alpha = 0.7
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::evaluation::EvaluationSettings;
use crate::search::embedder::{DEFAULT_BATCH_SIZE, Embedder, EmbedderError};
use crate::search::fusion::FusionConfig;
use crate::search::hash_embedder::HashEmbedder;
use crate::search::jina_reranker::{DEFAULT_JINA_ENDPOINT, DEFAULT_JINA_MODEL, JinaReranker};
use crate::search::openai_embedder::{
    DEFAULT_OPENAI_DIMENSION, DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL, OpenAiEmbedder,
};
use crate::search::rerank_gate::{DEFAULT_RERANK_THRESHOLD, RerankGate};
use crate::search::reranker::RerankerError;

const APP_DIR: &str = "listing-search";
const CONFIG_FILE: &str = "config.toml";
const HASH_DIMENSION: usize = 384;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline feature hashing.
    #[default]
    Hash,
    OpenAi,
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unknown embedding provider `{other}` (expected hash|openai)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankProvider {
    #[default]
    None,
    Jina,
}

impl FromStr for RerankProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "jina" => Ok(Self::Jina),
            other => Err(ConfigError::Validation(format!(
                "unknown rerank provider `{other}` (expected none|jina)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// `None` picks the provider's native width.
    pub dimension: Option<usize>,
    pub batch_size: usize,
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            dimension: None,
            batch_size: DEFAULT_BATCH_SIZE,
            endpoint: DEFAULT_OPENAI_ENDPOINT.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingConfig {
    pub fn effective_dimension(&self) -> usize {
        self.dimension.unwrap_or(match self.provider {
            EmbeddingProvider::Hash => HASH_DIMENSION,
            EmbeddingProvider::OpenAi => DEFAULT_OPENAI_DIMENSION,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub provider: RerankProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub threshold: f32,
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: RerankProvider::default(),
            model: DEFAULT_JINA_MODEL.to_string(),
            endpoint: DEFAULT_JINA_ENDPOINT.to_string(),
            api_key_env: "JINA_API_KEY".to_string(),
            threshold: DEFAULT_RERANK_THRESHOLD,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the daily rolling debug log. Unset disables file logging.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub fusion: FusionConfig,
    pub evaluation: EvaluationSettings,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            debug!(path = %path.display(), "No config file; using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// - Primary: `$XDG_CONFIG_HOME/listing-search/config.toml`
    /// - Fallback: platform config dir (e.g. `~/.config/listing-search/config.toml`)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
        }

        dirs::config_dir()
            .map(|p| p.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// `LSEARCH_*` variables override the file. `.env` is honoured through
    /// `dotenvy::var`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = dotenvy::var("LSEARCH_EMBEDDING_PROVIDER") {
            self.embedding.provider = value.parse()?;
        }
        if let Ok(value) = dotenvy::var("LSEARCH_RERANK_PROVIDER") {
            self.rerank.provider = value.parse()?;
        }
        if let Ok(value) = dotenvy::var("LSEARCH_FUSION_ALPHA") {
            self.fusion.alpha = parse_env_number("LSEARCH_FUSION_ALPHA", &value)?;
        }
        if let Ok(value) = dotenvy::var("LSEARCH_RERANK_THRESHOLD") {
            self.rerank.threshold = parse_env_number("LSEARCH_RERANK_THRESHOLD", &value)?;
        }
        if let Ok(value) = dotenvy::var("LSEARCH_LOG_DIR")
            && !value.trim().is_empty()
        {
            self.logging.log_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fusion.alpha) {
            return Err(ConfigError::Validation(format!(
                "fusion.alpha must be within [0, 1], got {}",
                self.fusion.alpha
            )));
        }
        if self.fusion.dense_candidates == 0 {
            return Err(ConfigError::Validation(
                "fusion.dense_candidates must be at least 1".into(),
            ));
        }
        if self.embedding.effective_dimension() == 0 {
            return Err(ConfigError::Validation(
                "embedding.dimension must be at least 1".into(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::Validation(
                "embedding.batch_size must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("rerank.threshold", self.rerank.threshold),
            ("evaluation.rerank_threshold", self.evaluation.rerank_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.evaluation.top_k_retrieval == 0 || self.evaluation.top_k_rerank == 0 {
            return Err(ConfigError::Validation(
                "evaluation top-k values must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the configured embedder.
    pub fn build_embedder(&self) -> Result<Arc<dyn Embedder>, EmbedderError> {
        let cfg = &self.embedding;
        let dimension = cfg.effective_dimension();
        match cfg.provider {
            EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(dimension))),
            EmbeddingProvider::OpenAi => {
                let api_key = read_api_key(&cfg.api_key_env);
                if api_key.is_none() {
                    warn!(
                        env = %cfg.api_key_env,
                        "Embedding API key not set; requests will be rejected"
                    );
                }
                Ok(Arc::new(OpenAiEmbedder::new(
                    cfg.endpoint.clone(),
                    cfg.model.clone(),
                    api_key,
                    dimension,
                    cfg.timeout_secs,
                )?))
            }
        }
    }

    /// Build the configured rerank gate. `enabled = false` forces passthrough.
    pub fn build_rerank_gate(&self, enabled: bool) -> Result<RerankGate, RerankerError> {
        let cfg = &self.rerank;
        if !enabled || cfg.provider == RerankProvider::None {
            return Ok(RerankGate::passthrough().with_threshold(cfg.threshold));
        }
        let reranker = JinaReranker::new(
            cfg.endpoint.clone(),
            cfg.model.clone(),
            read_api_key(&cfg.api_key_env),
            cfg.timeout_secs,
        )?;
        Ok(RerankGate::new(Arc::new(reranker), cfg.threshold))
    }
}

fn parse_env_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{name} is not a number: `{value}`")))
}

fn read_api_key(env_name: &str) -> Option<String> {
    dotenvy::var(env_name).ok().filter(|key| !key.trim().is_empty())
}
