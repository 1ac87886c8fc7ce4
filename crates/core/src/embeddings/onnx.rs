// Local sentence-transformer embeddings via ONNX Runtime
//
// Loads a BERT-style sentence-transformer export (model.onnx + tokenizer.json) once and
// serves embeddings by mean pooling the token states under the attention mask.
// Decision: CPU execution provider only
// Decision: Inference runs on the blocking pool; the session mutex is held only for the
//           duration of one `run` call

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use ndarray::{Array2, ArrayView2, Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};

use super::Embedder;
use crate::error::{Result, ServiceError};

/// Maximum sequence length used by the MiniLM sentence-transformers
const MAX_SEQUENCE_LENGTH: usize = 128;

#[derive(Clone)]
pub struct OnnxEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
}

impl std::fmt::Debug for OnnxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbedder")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbedder {
    /// Load the model and tokenizer from disk
    pub fn new(
        model_name: impl Into<String>,
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure tokenizer truncation: {}", e))?;

        tracing::info!(model = %model_name, path = %model_path.display(), "ONNX embedding model loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
        })
    }

    fn encode_blocking(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = vec![0i64; input_ids.len()];
        let seq_len = input_ids.len();

        let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .context("Failed to create attention_mask array")?;
        let token_type_ids_array = Array2::from_shape_vec((1, seq_len), token_type_ids)
            .context("Failed to create token_type_ids array")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?,
            "token_type_ids" => Value::from_array(token_type_ids_array)?
        ])?;

        // [batch, seq_len, hidden]
        let token_states = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?
            .into_dimensionality::<Ix3>()
            .context("Model output is not [batch, seq_len, hidden]")?;

        Ok(mean_pool(token_states.index_axis(Axis(0), 0), &attention_mask))
    }
}

/// Average token embeddings, counting only positions where the attention mask is set
pub fn mean_pool(token_states: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
    let hidden = token_states.shape()[1];
    let mut pooled = vec![0.0f32; hidden];
    let mut weight = 0.0f32;

    for (row, &mask) in token_states.outer_iter().zip(attention_mask) {
        let mask = mask as f32;
        weight += mask;
        for (acc, value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value * mask;
        }
    }

    let weight = weight.max(1e-9);
    for value in &mut pooled {
        *value /= weight;
    }
    pooled
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let this = self.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || this.encode_blocking(&text))
            .await
            .map_err(|e| ServiceError::embedding(format!("Embedding task failed: {}", e)))?
            .map_err(|e| ServiceError::embedding(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const MODEL_PATH: &str = "models/paraphrase-MiniLM-L6-v2/model.onnx";
    const TOKENIZER_PATH: &str = "models/paraphrase-MiniLM-L6-v2/tokenizer.json";

    #[test]
    fn test_mean_pool_ignores_padding() {
        let states = array![[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]];
        let pooled = mean_pool(states.view(), &[1, 1, 0]);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_all_masked_is_zero() {
        let states = array![[1.0f32, 2.0]];
        let pooled = mean_pool(states.view(), &[0]);
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_file() {
        let err = OnnxEmbedder::new("x", "/nonexistent/model.onnx", "/nonexistent/tok.json")
            .unwrap_err();
        assert!(err.to_string().contains("ONNX model file not found"));
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_embed_paraphrases() {
        let embedder = OnnxEmbedder::new("paraphrase-MiniLM-L6-v2", MODEL_PATH, TOKENIZER_PATH)
            .unwrap();
        let a = embedder.encode("A man is eating food.").await.unwrap();
        let b = embedder.encode("A man is eating a meal.").await.unwrap();
        assert_eq!(a.len(), 384);
        let score = crate::similarity::cosine_similarity(&a, &b).unwrap();
        assert!(score > 0.8);
    }
}
