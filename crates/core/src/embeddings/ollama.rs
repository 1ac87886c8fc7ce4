// Ollama HTTP embedding backend

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Embedder;
use crate::error::{Result, ServiceError};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedder backed by an Ollama-compatible `/api/embeddings` endpoint
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    api_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build embedding HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| ServiceError::embedding(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::embedding(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::embedding(format!("Invalid embedding response: {}", e)))?;

        if body.embedding.is_empty() {
            return Err(ServiceError::embedding("Embedding API returned an empty vector"));
        }

        Ok(body.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn embedder_for(server: &MockServer) -> OllamaEmbedder {
        OllamaEmbedder::new(
            format!("{}/api/embeddings", server.uri()),
            "all-minilm",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_encode_returns_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(
                serde_json::json!({"model": "all-minilm", "prompt": "hello"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [0.5, -0.25, 1.0]})),
            )
            .mount(&server)
            .await;

        let embedder = embedder_for(&server).await;
        let vector = embedder.encode("hello").await.unwrap();
        assert_eq!(vector, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn test_error_status_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let embedder = embedder_for(&server).await;
        let err = embedder.encode("hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::Embedding(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_empty_vector_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": []})),
            )
            .mount(&server)
            .await;

        let embedder = embedder_for(&server).await;
        assert!(embedder.encode("hello").await.is_err());
    }
}
