// Sentence embedding backends
//
// Decision: The embedder is built once at startup and shared as Arc<dyn Embedder>;
// implementations are read-only after construction.
// Decision: Ollama HTTP embeddings by default; a local ONNX sentence-transformer behind the
// `onnx` cargo feature.

mod ollama;
#[cfg(feature = "onnx")]
mod onnx;

pub use ollama::OllamaEmbedder;
#[cfg(feature = "onnx")]
pub use onnx::{mean_pool, OnnxEmbedder};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::generation::timeout_from_secs;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11434/api/embeddings";
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "all-minilm";
pub const DEFAULT_ONNX_EMBEDDING_MODEL: &str = "paraphrase-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns text into a fixed-dimensionality vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logging and health output
    fn model_name(&self) -> &str;
}

/// Which embedding implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackendKind {
    #[default]
    Ollama,
    Onnx,
}

impl EmbeddingBackendKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "onnx" => Some(Self::Onnx),
            _ => None,
        }
    }
}

/// Embedding backend settings
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackendKind,
    /// Embeddings endpoint (ollama backend)
    pub api_url: String,
    pub model: String,
    /// Request timeout (ollama backend)
    pub timeout: Duration,
    /// ONNX model file (onnx backend)
    pub onnx_model_path: Option<PathBuf>,
    /// tokenizer.json (onnx backend)
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::Ollama,
            api_url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string(),
            timeout: DEFAULT_EMBEDDING_TIMEOUT,
            onnx_model_path: None,
            tokenizer_path: None,
        }
    }
}

impl EmbeddingConfig {
    /// Load configuration from environment variables
    ///
    /// - `EMBEDDING_BACKEND`: `ollama` (default) or `onnx`
    /// - `EMBEDDING_API_URL`, `EMBEDDING_MODEL`, `EMBEDDING_TIMEOUT_SECS`
    /// - `EMBEDDING_ONNX_MODEL_PATH`, `EMBEDDING_TOKENIZER_PATH`
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("EMBEDDING_BACKEND") {
            Ok(s) if !s.trim().is_empty() => EmbeddingBackendKind::from_str(&s)
                .ok_or_else(|| anyhow::anyhow!("Unknown EMBEDDING_BACKEND: {}", s))?,
            _ => EmbeddingBackendKind::default(),
        };

        let default_model = match backend {
            EmbeddingBackendKind::Ollama => DEFAULT_OLLAMA_EMBEDDING_MODEL,
            EmbeddingBackendKind::Onnx => DEFAULT_ONNX_EMBEDDING_MODEL,
        };

        Ok(Self {
            backend,
            api_url: std::env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_URL.to_string()),
            model: std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| default_model.to_string()),
            timeout: timeout_from_secs(
                std::env::var("EMBEDDING_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_EMBEDDING_TIMEOUT,
            ),
            onnx_model_path: std::env::var("EMBEDDING_ONNX_MODEL_PATH").ok().map(PathBuf::from),
            tokenizer_path: std::env::var("EMBEDDING_TOKENIZER_PATH").ok().map(PathBuf::from),
        })
    }
}

/// Build the process-wide embedder. The ONNX model, when selected, is loaded eagerly here.
pub fn build_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.backend {
        EmbeddingBackendKind::Ollama => Ok(Arc::new(OllamaEmbedder::new(
            config.api_url.clone(),
            config.model.clone(),
            config.timeout,
        )?)),
        EmbeddingBackendKind::Onnx => build_onnx(config),
    }
}

#[cfg(feature = "onnx")]
fn build_onnx(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let model_path = config
        .onnx_model_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("EMBEDDING_ONNX_MODEL_PATH is required for the onnx backend"))?;
    let tokenizer_path = config
        .tokenizer_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("EMBEDDING_TOKENIZER_PATH is required for the onnx backend"))?;

    Ok(Arc::new(OnnxEmbedder::new(
        config.model.clone(),
        model_path,
        tokenizer_path,
    )?))
}

#[cfg(not(feature = "onnx"))]
fn build_onnx(_config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    anyhow::bail!("EMBEDDING_BACKEND=onnx requires promptgate-core to be built with the `onnx` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_embedding_timeout_uses_default() {
        assert_eq!(
            timeout_from_secs(Some("0"), DEFAULT_EMBEDDING_TIMEOUT),
            DEFAULT_EMBEDDING_TIMEOUT
        );
        assert_eq!(
            timeout_from_secs(Some("15"), DEFAULT_EMBEDDING_TIMEOUT),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!(
            EmbeddingBackendKind::from_str("ollama"),
            Some(EmbeddingBackendKind::Ollama)
        );
        assert_eq!(
            EmbeddingBackendKind::from_str(" ONNX "),
            Some(EmbeddingBackendKind::Onnx)
        );
        assert_eq!(EmbeddingBackendKind::from_str("torch"), None);
    }

    #[test]
    fn test_default_config_targets_local_ollama() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.backend, EmbeddingBackendKind::Ollama);
        assert_eq!(config.api_url, DEFAULT_EMBEDDING_URL);
        assert!(config.onnx_model_path.is_none());
    }

    #[test]
    fn test_build_ollama_embedder() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), DEFAULT_OLLAMA_EMBEDDING_MODEL);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_backend_requires_feature() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackendKind::Onnx,
            ..Default::default()
        };
        assert!(build_embedder(&config).is_err());
    }
}
