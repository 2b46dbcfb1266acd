//! TOML configuration parsing and validation.
//!
//! The engine reads all tunables at initialization: cache TTL,
//! similarity thresholds, the embedding provider endpoint and
//! credentials, corpus and store paths, and the server bind address.
//! See `config/nutribot.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Corpus cache time-to-live in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Minimum cosine similarity for a document to qualify in retrieval.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    /// Retrieval confidence at or above which the cascade stops early.
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f64,
    /// Maximum documents returned by a retrieval search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Maximum accepted message length in characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: default_cache_ttl_ms(),
            min_similarity: default_min_similarity(),
            high_confidence_threshold: default_high_confidence_threshold(),
            max_results: default_max_results(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

fn default_cache_ttl_ms() -> u64 {
    300_000
}
fn default_min_similarity() -> f32 {
    0.5
}
fn default_high_confidence_threshold() -> f64 {
    0.6
}
fn default_max_results() -> usize {
    3
}
fn default_max_message_chars() -> usize {
    2_000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CorpusConfig {
    /// Path to a curated intent corpus (JSON). When absent the built-in
    /// seed corpus is used.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Path of the vector store snapshot file (JSON). When absent the
    /// store is memory-only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"disabled"`, `"openai"`, or `"ollama"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Endpoint override (Ollama only).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7399".to_string()
}

/// Load and validate configuration. A missing file yields the defaults
/// (seed corpus, memory-only store, embeddings disabled).
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(0.0..=1.0).contains(&config.engine.min_similarity) {
        anyhow::bail!("engine.min_similarity must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.engine.high_confidence_threshold) {
        anyhow::bail!("engine.high_confidence_threshold must be in [0.0, 1.0]");
    }
    if config.engine.max_results < 1 {
        anyhow::bail!("engine.max_results must be >= 1");
    }
    if config.engine.max_message_chars < 1 {
        anyhow::bail!("engine.max_message_chars must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.cache_ttl_ms, 300_000);
        assert_eq!(config.engine.min_similarity, 0.5);
        assert_eq!(config.engine.high_confidence_threshold, 0.6);
        assert_eq!(config.embedding.provider, "disabled");
        assert!(config.corpus.path.is_none());
    }

    #[test]
    fn test_enabled_embedding_requires_model_and_dims() {
        let config: Config = toml::from_str(
            r#"
            [embedding]
            provider = "openai"
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config: Config = toml::from_str(
            r#"
            [embedding]
            provider = "mainframe"
            model = "m"
            dims = 8
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_threshold_bounds_validated() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            high_confidence_threshold = 1.5
            "#,
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }
}
