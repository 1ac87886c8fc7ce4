// Authentication module
//
// Email/password accounts, stateless HS256 session tokens and the auth gate that protects
// the generation and similarity routes.

pub mod config;
pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod routes;

pub use config::AuthConfig;
pub use credentials::{CredentialStore, ValidationErrors};
pub use jwt::{JwtService, TokenError};
pub use middleware::{require_token, AuthError, AuthState, AuthUser};
pub use routes::routes;
