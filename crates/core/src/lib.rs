// Promptgate core
//
// Model-facing building blocks shared by the gateway: the streaming generation proxy,
// the text post-processor and embedding-based similarity.
//
// Key design decisions:
// - Upstream access goes through traits (GenerationBackend, Embedder) so HTTP handlers can be
//   tested against in-process fakes
// - The embedding backend is chosen once at startup (Ollama HTTP or local ONNX)
// - Error handling distinguishes client errors (bad input) from upstream and internal failures

pub mod error;
pub mod generation;
pub mod similarity;
pub mod transform;

// Embedding backends (Ollama HTTP, optional ONNX Runtime)
pub mod embeddings;

// Logging setup
pub mod telemetry;

// Re-exports for convenience
pub use embeddings::{build_embedder, Embedder, EmbeddingBackendKind, EmbeddingConfig};
pub use error::{Result, ServiceError};
pub use generation::{GenerationBackend, GenerationConfig, GenerationProxy, OllamaGenerator};
pub use similarity::{
    cosine_similarity, SimilarityResult, SimilarityService, Verdict, SIMILARITY_THRESHOLD,
};
pub use transform::transform_text;
