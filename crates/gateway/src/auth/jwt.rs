// Session token service
// Decision: HS256 with a single server secret, no refresh tokens, no server-side state
// Decision: Lifetime is fixed at 60 minutes and validated with zero leeway

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token lifetime in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// User ID
    pub id: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Reasons a token is rejected. Display strings are the client-facing messages.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has expired!")]
    Expired,
    #[error("Invalid token!")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mint a token for `user_id`, valid for 60 minutes from now
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String> {
        let iat = issued_at.timestamp();
        let claims = SessionClaims {
            id: user_id,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode session token")
    }

    /// Validate a token and return the user ID it was issued for
    pub fn verify(&self, token: &str) -> std::result::Result<Uuid, TokenError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.id)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!(error = %e, "Session token rejected");
                    TokenError::Invalid
                }
            })
    }
}
