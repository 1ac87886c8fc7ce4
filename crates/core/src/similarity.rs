// Semantic similarity of two texts
//
// Decision: Cosine similarity is computed in f64 over f32 embeddings, with the norm product
// clamped to 1e-8 so zero vectors score 0 instead of NaN.
// Decision: The 0.80 threshold is inclusive.

use std::sync::Arc;

use crate::embeddings::Embedder;
use crate::error::{Result, ServiceError};

/// Scores at or above this are "similar"
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Message returned when either text is absent or empty
pub const MISSING_TEXTS: &str = "Missing text1 or text2 in the request body";

const NORM_EPSILON: f64 = 1e-8;

/// Binary outcome of comparing two texts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Similar,
    NotSimilar,
}

impl Verdict {
    pub fn from_score(score: f64) -> Self {
        if score >= SIMILARITY_THRESHOLD {
            Verdict::Similar
        } else {
            Verdict::NotSimilar
        }
    }

    /// Human-readable sentence returned to API clients
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Similar => "The texts are similar.",
            Verdict::NotSimilar => "The texts are not similar.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityResult {
    pub score: f64,
    pub verdict: Verdict,
}

/// Cosine similarity of two equal-length vectors, in [-1, 1]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(ServiceError::embedding(format!(
            "Embedding dimensions differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(ServiceError::embedding("Cannot compare empty embeddings"));
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a.sqrt() * norm_b.sqrt()).max(NORM_EPSILON);
    Ok((dot / denominator).clamp(-1.0, 1.0))
}

/// Embeds pairs of texts and classifies their similarity
#[derive(Clone)]
pub struct SimilarityService {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityService {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub async fn analyze(
        &self,
        text1: Option<&str>,
        text2: Option<&str>,
    ) -> Result<SimilarityResult> {
        let (text1, text2) = match (text1, text2) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => (a, b),
            _ => return Err(ServiceError::bad_request(MISSING_TEXTS)),
        };

        let (e1, e2) =
            futures::try_join!(self.embedder.encode(text1), self.embedder.encode(text2))?;
        let score = cosine_similarity(&e1, &e2)?;
        let verdict = Verdict::from_score(score);

        tracing::debug!(
            model = %self.embedder.model_name(),
            score,
            verdict = ?verdict,
            "Similarity computed"
        );

        Ok(SimilarityResult { score, verdict })
    }
}
