// Authentication middleware and extractors
// Decision: Token comes from the Authorization header only, raw or with a "Bearer " prefix
// Decision: Every auth failure on a protected route is 403, with a message naming the cause

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{config::AuthConfig, credentials::CredentialStore, jwt::JwtService};
use crate::storage::StorageBackend;

pub const TOKEN_MISSING: &str = "Token is missing!";

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::FORBIDDEN,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Identity attached to a request that passed the auth gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

/// Auth state shared across routes
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub jwt_service: Arc<JwtService>,
    pub credentials: CredentialStore,
}

impl AuthState {
    pub fn new(config: AuthConfig, storage: StorageBackend) -> Self {
        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret));
        Self {
            config,
            jwt_service,
            credentials: CredentialStore::new(storage),
        }
    }
}

/// Gate for protected routes. Rejects with 403 before the handler runs; on success the
/// caller's [`AuthUser`] is available to the handler.
pub async fn require_token(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_token(request.headers())?;

    let id = state.jwt_service.verify(token).map_err(|e| {
        tracing::debug!(reason = %e, path = %request.uri().path(), "Auth gate rejected request");
        AuthError::forbidden(&e.to_string())
    })?;

    request.extensions_mut().insert(AuthUser { id });
    Ok(next.run(request).await)
}

/// Read the token from the Authorization header, stripping an optional "Bearer " prefix
fn extract_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AuthError::forbidden(TOKEN_MISSING))?;

    let raw = value
        .to_str()
        .map_err(|_| AuthError::forbidden(&super::jwt::TokenError::Invalid.to_string()))?
        .trim();

    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() {
        return Err(AuthError::forbidden(TOKEN_MISSING));
    }

    Ok(token)
}

/// Extractor for the identity set by [`require_token`]
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AuthError::forbidden(TOKEN_MISSING))
    }
}
