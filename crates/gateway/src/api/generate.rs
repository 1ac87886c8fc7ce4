// Text generation API route
// Decision: POST only; other methods get 405 before the auth gate runs
// Decision: The body is parsed by the handler so malformed JSON surfaces as a 500 with the
//           parser message

use axum::{
    body::Bytes,
    extract::State,
    middleware,
    routing::post,
    Json, Router,
};
use promptgate_core::GenerationProxy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{post_only, ApiError, ErrorResponse};
use crate::auth::middleware::{require_token, AuthState, AuthUser};

/// Request to generate text
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Prompt forwarded to the inference server
    #[schema(example = "Write a haiku about rust")]
    pub prompt: Option<String>,
}

/// Generated text after post-processing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub response: String,
}

pub fn routes(proxy: GenerationProxy, auth: AuthState) -> Router {
    Router::new()
        .route(
            "/generate/",
            post(generate_text)
                .route_layer(middleware::from_fn_with_state(auth, require_token))
                .fallback(post_only),
        )
        .with_state(proxy)
}

/// POST /generate/ - Generate text from a prompt
#[utoipa::path(
    post,
    path = "/generate/",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated text", body = GenerateResponse),
        (status = 400, description = "Missing prompt", body = ErrorResponse),
        (status = 403, description = "Missing, expired or invalid token", body = ErrorResponse),
        (status = 405, description = "Method other than POST", body = ErrorResponse),
        (status = 500, description = "Upstream or parsing failure", body = ErrorResponse)
    ),
    security(("bearer_token" = [])),
    tag = "generation"
)]
pub async fn generate_text(
    State(proxy): State<GenerationProxy>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request: GenerateRequest = serde_json::from_slice(&body)?;
    tracing::debug!(user_id = %user.id, "Generation requested");

    let response = proxy.generate(request.prompt.as_deref()).await?;
    Ok(Json(GenerateResponse { response }))
}
