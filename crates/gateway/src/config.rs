// Gateway configuration
//
// Everything is read from environment variables (a `.env` file is loaded first by main).
// Component settings live next to their components; this module only gathers them.

use anyhow::Context;
use axum::http::HeaderValue;
use promptgate_core::{EmbeddingConfig, GenerationConfig};
use std::net::SocketAddr;

use crate::auth::AuthConfig;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// PostgreSQL URL; in-memory storage when unset
    pub database_url: Option<String>,
    /// Prefix for all API routes (e.g. "/api"); health and docs stay unprefixed
    pub api_prefix: String,
    /// Allowed CORS origins; no CORS layer when empty
    pub cors_origins: Vec<HeaderValue>,
    pub auth: AuthConfig,
    pub generation: GenerationConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database_url: None,
            api_prefix: String::new(),
            cors_origins: Vec::new(),
            auth: AuthConfig::default(),
            generation: GenerationConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// - `BIND_ADDR` (default: 0.0.0.0:8000)
    /// - `DATABASE_URL`
    /// - `API_PREFIX`
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origins
    /// - `AUTH_*`, `GENERATION_*`, `EMBEDDING_*`: see the component configs
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            bind_addr,
            database_url,
            api_prefix: normalize_prefix(&std::env::var("API_PREFIX").unwrap_or_default()),
            cors_origins: parse_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
            auth: AuthConfig::from_env(),
            generation: GenerationConfig::from_env(),
            embedding: EmbeddingConfig::from_env()?,
        })
    }
}

/// "api/" and "/api/" both become "/api"; blank stays blank
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_origins(value: &str) -> Vec<HeaderValue> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix(" /v1/api "), "/v1/api");
    }

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins("https://app.example.com, http://localhost:3000,,");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://app.example.com");
        assert!(parse_origins("").is_empty());
    }
}
