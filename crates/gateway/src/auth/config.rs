// Authentication configuration loaded from environment variables.
// Decision: AUTH_ prefix for all auth config
// Decision: Without AUTH_JWT_SECRET a random per-process secret is used, so tokens do not
//           survive a restart

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Secret key for signing session tokens (HS256)
    pub jwt_secret: String,
    /// Whether the `token` cookie carries the Secure attribute
    pub cookie_secure: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: generate_secret(),
            cookie_secure: false,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables
    ///
    /// - `AUTH_JWT_SECRET`: signing secret (random per process when unset)
    /// - `AUTH_COOKIE_SECURE`: "true"/"1" to mark the session cookie Secure
    pub fn from_env() -> Self {
        let jwt_secret = match std::env::var("AUTH_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "AUTH_JWT_SECRET not set, using a random secret; tokens will not survive a restart"
                );
                generate_secret()
            }
        };

        let cookie_secure = std::env::var("AUTH_COOKIE_SECURE")
            .map(|s| s.to_lowercase() == "true" || s == "1")
            .unwrap_or(false);

        Self {
            jwt_secret,
            cookie_secure,
        }
    }

    /// Build a config with a fixed secret
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            cookie_secure: false,
        }
    }
}

/// Random 256-bit secret, hex encoded
fn generate_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
