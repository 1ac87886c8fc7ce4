// Authentication HTTP routes
// Decision: Login returns the token in the body and as an http-only `token` cookie
// Decision: Login failures name the cause ("User not found" / "Incorrect password")

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    credentials::{NewUser, RegisterError, ValidationErrors},
    jwt::TOKEN_LIFETIME_SECS,
    middleware::{require_token, AuthError, AuthState, AuthUser},
};
use crate::api::common::ErrorResponse;
use crate::storage::UserRow;

pub const TOKEN_COOKIE: &str = "token";

/// Register request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Public user representation (never includes the password hash)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Create auth routes. `/user/` sits behind the auth gate.
pub fn routes(state: AuthState) -> Router {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/logout/", post(logout))
        .route(
            "/user/",
            get(get_current_user).route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_token,
            )),
        )
        .with_state(state)
}

/// POST /register/ - Create an account
#[utoipa::path(
    post,
    path = "/register/",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 400, description = "Field errors, keyed by field name"),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AuthState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, RegisterRejection> {
    let user = state
        .credentials
        .register(NewUser {
            email: req.email.as_deref(),
            password: req.password.as_deref(),
            name: req.name.as_deref(),
        })
        .await
        .map_err(|e| match e {
            RegisterError::Validation(errors) => RegisterRejection::Invalid(errors),
            RegisterError::Storage(e) => {
                tracing::error!(error = %e, "User creation failed");
                RegisterRejection::Failed(AuthError::internal("Registration failed"))
            }
        })?;

    Ok(Json(user.into()))
}

/// Register failures: field errors (400) or a server-side failure
pub enum RegisterRejection {
    Invalid(ValidationErrors),
    Failed(AuthError),
}

impl axum::response::IntoResponse for RegisterRejection {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Invalid(errors) => errors.into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

/// POST /login/ - Exchange credentials for a session token
#[utoipa::path(
    post,
    path = "/login/",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token; also set as the `token` cookie", body = TokenResponse),
        (status = 401, description = "Unknown email or wrong password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AuthError> {
    let user = state
        .credentials
        .find_by_email(&req.email)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Storage error during login");
            AuthError::internal("Login failed")
        })?
        .ok_or_else(|| AuthError::unauthorized("User not found"))?;

    if !state.credentials.verify_password(&user, &req.password) {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AuthError::unauthorized("Incorrect password"));
    }

    let token = state.jwt_service.issue(user.id).map_err(|e| {
        tracing::error!(error = %e, "Token generation error");
        AuthError::internal("Login failed")
    })?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(TOKEN_LIFETIME_SECS))
        .build();

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((jar.add(cookie), Json(TokenResponse { token })))
}

/// POST /logout/ - Clear the session cookie
///
/// Tokens are stateless; an already-issued token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/logout/",
    responses(
        (status = 200, description = "Cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    // Always emit the removal cookie, even if the request carried none
    let mut removal = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    removal.make_removal();

    (
        jar.add(removal),
        Json(MessageResponse {
            message: "success".to_string(),
        }),
    )
}

/// GET /user/ - Current user
#[utoipa::path(
    get,
    path = "/user/",
    responses(
        (status = 200, description = "Authenticated user", body = UserResponse),
        (status = 403, description = "Missing, expired or invalid token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer_token" = [])),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<AuthState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, (StatusCode, Json<ErrorResponse>)> {
    let row = state
        .credentials
        .find_by_id(user.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user");
            ErrorResponse::new("Internal server error").into_response(StatusCode::INTERNAL_SERVER_ERROR)
        })?
        .ok_or_else(|| ErrorResponse::new("User not found").into_response(StatusCode::NOT_FOUND))?;

    Ok(Json(row.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::AuthConfig;
    use crate::storage::StorageBackend;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        routes(AuthState::new(
            AuthConfig::with_secret("routes-test-secret"),
            StorageBackend::in_memory(),
        ))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_user_without_password() {
        let response = app()
            .oneshot(post_json(
                "/register/",
                serde_json::json!({"email": "ada@example.com", "password": "pw", "name": "Ada"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["name"], "Ada");
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_register_field_errors() {
        let response = app()
            .oneshot(post_json("/register/", serde_json::json!({"email": "nope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["email"][0], "Enter a valid email address.");
        assert_eq!(body["password"][0], "This field is required.");
    }

    #[tokio::test]
    async fn test_login_flow_and_cookie() {
        let app = app();
        app.clone()
            .oneshot(post_json(
                "/register/",
                serde_json::json!({"email": "ada@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/login/",
                serde_json::json!({"email": "ada@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));

        let body = body_json(response).await;
        let token = body["token"].as_str().unwrap();
        assert!(cookie.contains(token));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/user/")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_name_the_cause() {
        let app = app();
        app.clone()
            .oneshot(post_json(
                "/register/",
                serde_json::json!({"email": "ada@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/login/",
                serde_json::json!({"email": "bob@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "User not found");

        let response = app
            .oneshot(post_json(
                "/login/",
                serde_json::json!({"email": "ada@example.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Incorrect password");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(body_json(response).await["message"], "success");
    }

    #[tokio::test]
    async fn test_user_requires_token() {
        let response = app()
            .oneshot(Request::builder().uri("/user/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "Token is missing!");
    }
}
