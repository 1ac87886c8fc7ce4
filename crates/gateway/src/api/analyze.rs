// Context similarity API route
// Decision: Accepts any HTTP method

use axum::{
    body::Bytes,
    extract::State,
    middleware,
    routing::any,
    Json, Router,
};
use promptgate_core::SimilarityService;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{ApiError, ErrorResponse};
use crate::auth::middleware::{require_token, AuthState, AuthUser};

/// Two passages to compare
#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub text1: Option<String>,
    pub text2: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    /// "The texts are similar." or "The texts are not similar."
    pub similarity_response: String,
    /// Cosine similarity of the two embeddings, in [-1, 1]
    pub similarity_score: f64,
}

pub fn routes(similarity: SimilarityService, auth: AuthState) -> Router {
    Router::new()
        .route(
            "/analyze_context/",
            any(analyze_context).route_layer(middleware::from_fn_with_state(auth, require_token)),
        )
        .with_state(similarity)
}

/// POST /analyze_context/ - Compare two texts
#[utoipa::path(
    post,
    path = "/analyze_context/",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Similarity verdict and score", body = AnalyzeResponse),
        (status = 400, description = "Missing text1 or text2", body = ErrorResponse),
        (status = 403, description = "Missing, expired or invalid token", body = ErrorResponse),
        (status = 500, description = "Embedding or parsing failure", body = ErrorResponse)
    ),
    security(("bearer_token" = [])),
    tag = "similarity"
)]
pub async fn analyze_context(
    State(similarity): State<SimilarityService>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body)?;

    let result = similarity
        .analyze(request.text1.as_deref(), request.text2.as_deref())
        .await?;

    tracing::debug!(user_id = %user.id, score = result.score, "Similarity analyzed");

    Ok(Json(AnalyzeResponse {
        similarity_response: result.verdict.message().to_string(),
        similarity_score: result.score,
    }))
}
