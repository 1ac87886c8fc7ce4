// OpenAPI specification generation
//
// Used by the server (Swagger UI) and by the export-openapi binary.

use crate::api;
use crate::auth;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation for the promptgate API
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::routes::register,
        auth::routes::login,
        auth::routes::logout,
        auth::routes::get_current_user,
        api::generate::generate_text,
        api::analyze::analyze_context,
    ),
    components(
        schemas(
            api::ErrorResponse,
            auth::routes::RegisterRequest,
            auth::routes::LoginRequest,
            auth::routes::TokenResponse,
            auth::routes::UserResponse,
            auth::routes::MessageResponse,
            api::generate::GenerateRequest,
            api::generate::GenerateResponse,
            api::analyze::AnalyzeRequest,
            api::analyze::AnalyzeResponse,
        )
    ),
    modifiers(&BearerToken),
    tags(
        (name = "auth", description = "Registration, login and session endpoints"),
        (name = "generation", description = "Text generation via the upstream LLM"),
        (name = "similarity", description = "Semantic similarity of two texts")
    ),
    info(
        title = "promptgate API",
        version = "0.1.0",
        description = "Authenticated gateway for LLM text generation and text similarity",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_token` security scheme referenced by protected routes
struct BearerToken;

impl Modify for BearerToken {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate the OpenAPI spec as a pretty-printed JSON string
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
