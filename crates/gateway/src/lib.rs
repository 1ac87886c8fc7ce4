// Promptgate gateway
//
// HTTP surface for the promptgate services: account registration and login, an auth-gated
// text generation proxy and an auth-gated text similarity endpoint.

pub mod api;
pub mod auth;
pub mod config;
pub mod openapi;
pub mod state;
pub mod storage;

use axum::{
    extract::State,
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::GatewayConfig;
pub use openapi::ApiDoc;
pub use state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    storage: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage,
    })
}

/// Assemble the full application router
pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let health_state = HealthState {
        storage: state.storage_kind(),
    };

    let api_routes = Router::new()
        .merge(auth::routes(state.auth.clone()))
        .merge(api::generate::routes(state.generation, state.auth.clone()))
        .merge(api::analyze::routes(state.similarity, state.auth));

    // Health is never prefixed
    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(build_router_with_prefix(api_routes, &config.api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let app = if config.cors_origins.is_empty() {
        tracing::info!("CORS not configured (same-origin requests only)");
        app
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    header::ACCEPT,
                    header::ORIGIN,
                ])
                .allow_credentials(true),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
