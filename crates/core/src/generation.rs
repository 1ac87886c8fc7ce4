// Generation proxy
//
// Forwards a prompt to an Ollama-compatible `/api/generate` endpoint, drains the
// newline-delimited JSON stream and post-processes the reassembled text.
// Decision: One upstream call per request, no retries, body fully buffered before returning.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::error::{Result, ServiceError};
use crate::transform::transform_text;

pub const DEFAULT_GENERATION_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_GENERATION_MODEL: &str = "mistral";
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Message returned when the prompt is absent or empty
pub const MISSING_PROMPT: &str = "Missing prompt";

/// Upstream generation settings
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Full URL of the generate endpoint
    pub api_url: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Upper bound for the whole upstream exchange, including the streamed body
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GENERATION_URL.to_string(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl GenerationConfig {
    /// Load configuration from environment variables
    ///
    /// - `GENERATION_API_URL` (default: local Ollama generate endpoint)
    /// - `GENERATION_MODEL` (default: "mistral")
    /// - `GENERATION_TIMEOUT_SECS` (default: 300; 0 also means the default)
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("GENERATION_API_URL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_URL.to_string()),
            model: std::env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_MODEL.to_string()),
            timeout: timeout_from_secs(
                std::env::var("GENERATION_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_GENERATION_TIMEOUT,
            ),
        }
    }
}

/// Parse a whole-second timeout setting. Unset, unparseable and zero values fall back to
/// `default`; a zero timeout would fail every upstream call.
pub(crate) fn timeout_from_secs(raw: Option<&str>, default: Duration) -> Duration {
    match raw.map(str::trim).and_then(|s| s.parse::<u64>().ok()) {
        Some(secs) if secs > 0 => Duration::from_secs(secs),
        Some(_) => {
            tracing::warn!(default_secs = default.as_secs(), "Zero timeout ignored, using default");
            default
        }
        None => default,
    }
}

/// Something that can turn a prompt into raw generated text.
///
/// Implementations return the fragments joined in arrival order, each followed by a single
/// space. Post-processing is done by [`GenerationProxy`].
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Append one NDJSON line of the upstream stream to `combined`.
///
/// Blank lines are ignored. A line carrying an `error` field, or lacking `response`,
/// aborts the request.
pub fn push_fragment(combined: &mut String, line: &str) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }

    let chunk: GenerateChunk =
        serde_json::from_str(line).context("Malformed generation chunk from upstream")?;

    if let Some(error) = chunk.error {
        return Err(anyhow!("Upstream generation error: {}", error).into());
    }

    let fragment = chunk
        .response
        .ok_or_else(|| anyhow!("Generation chunk without a response field"))?;

    combined.push_str(&fragment);
    combined.push(' ');
    Ok(())
}

/// Ollama-compatible streaming generation client
#[derive(Clone)]
pub struct OllamaGenerator {
    client: Client,
    config: GenerationConfig,
}

impl OllamaGenerator {
    pub fn new(config: GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build generation HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl GenerationBackend for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send generation request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, url = %self.config.api_url, "Generation API returned an error status");
            return Err(ServiceError::upstream(status.as_u16()));
        }

        let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let mut lines = StreamReader::new(body).lines();

        let mut combined = String::new();
        let mut fragments = 0usize;
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read generation stream")?
        {
            push_fragment(&mut combined, &line)?;
            fragments += 1;
        }

        tracing::debug!(model = %self.config.model, fragments, "Generation stream drained");
        Ok(combined)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Validates prompts, calls the backend once and normalizes the result
#[derive(Clone)]
pub struct GenerationProxy {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationProxy {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, prompt: Option<&str>) -> Result<String> {
        let prompt = match prompt {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ServiceError::bad_request(MISSING_PROMPT)),
        };

        let combined = self.backend.complete(prompt).await?;
        let transformed = transform_text(&combined);
        tracing::debug!(
            model = %self.backend.model(),
            chars = transformed.len(),
            "Generation transformed"
        );

        Ok(transformed.trim().to_string())
    }
}
