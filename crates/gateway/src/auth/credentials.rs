// Credential store: user registration, lookup and password checks
// Decision: Field errors are collected per field and returned together as {field: [messages]}
// Decision: Email uniqueness is pre-checked for error reporting and enforced again by storage

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{
    password::{hash_password, verify_password},
    CreateUserRow, StorageBackend, StorageError, StorageResult, UserRow,
};

pub const MAX_EMAIL_CHARS: usize = 254;
pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_PASSWORD_CHARS: usize = 4096;

pub const FIELD_REQUIRED: &str = "This field is required.";
pub const FIELD_BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const DUPLICATE_EMAIL: &str = "user with this email already exists.";

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

fn too_long(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

/// Field-level validation errors, serialized as `{"field": ["message", ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid registration input")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Registration input as received from the client; every field may be absent
#[derive(Debug, Default)]
pub struct NewUser<'a> {
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
    pub name: Option<&'a str>,
}

#[derive(Clone)]
pub struct CredentialStore {
    storage: StorageBackend,
}

impl CredentialStore {
    pub fn new(storage: StorageBackend) -> Self {
        Self { storage }
    }

    pub fn storage_kind(&self) -> &'static str {
        self.storage.kind()
    }

    /// Validate input, hash the password and create the user
    pub async fn register(&self, input: NewUser<'_>) -> Result<UserRow, RegisterError> {
        let mut errors = ValidationErrors::default();

        let email = validate_email(input.email, &mut errors);
        let password = validate_password(input.password, &mut errors);
        let name = validate_name(input.name, &mut errors);

        if let Some(email) = email {
            if self.storage.get_user_by_email(email).await?.is_some() {
                errors.add("email", DUPLICATE_EMAIL);
            }
        }

        let (Some(email), Some(password), true) = (email, password, errors.is_empty()) else {
            return Err(RegisterError::Validation(errors));
        };

        let password_hash = hash_password(password).map_err(StorageError::Other)?;

        let user = self
            .storage
            .create_user(CreateUserRow {
                email: email.to_string(),
                name: name.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StorageError::DuplicateEmail => {
                    let mut errors = ValidationErrors::default();
                    errors.add("email", DUPLICATE_EMAIL);
                    RegisterError::Validation(errors)
                }
                other => RegisterError::Storage(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRow>> {
        self.storage.get_user_by_email(email).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> StorageResult<Option<UserRow>> {
        self.storage.get_user(id).await
    }

    /// Check a candidate password against the stored hash. A malformed hash never matches.
    pub fn verify_password(&self, user: &UserRow, candidate: &str) -> bool {
        match verify_password(candidate, &user.password_hash) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash is malformed");
                false
            }
        }
    }
}

fn validate_email<'a>(email: Option<&'a str>, errors: &mut ValidationErrors) -> Option<&'a str> {
    let Some(email) = email else {
        errors.add("email", FIELD_REQUIRED);
        return None;
    };

    let email = email.trim();
    if email.is_empty() {
        errors.add("email", FIELD_BLANK);
        return None;
    }

    let mut valid = true;
    if email.chars().count() > MAX_EMAIL_CHARS {
        errors.add("email", too_long(MAX_EMAIL_CHARS));
        valid = false;
    }
    if !EMAIL_SHAPE.is_match(email) {
        errors.add("email", INVALID_EMAIL);
        valid = false;
    }

    valid.then_some(email)
}

fn validate_password<'a>(password: Option<&'a str>, errors: &mut ValidationErrors) -> Option<&'a str> {
    match password {
        None => {
            errors.add("password", FIELD_REQUIRED);
            None
        }
        Some("") => {
            errors.add("password", FIELD_BLANK);
            None
        }
        Some(p) if p.chars().count() > MAX_PASSWORD_CHARS => {
            errors.add("password", too_long(MAX_PASSWORD_CHARS));
            None
        }
        Some(p) => Some(p),
    }
}

fn validate_name<'a>(name: Option<&'a str>, errors: &mut ValidationErrors) -> &'a str {
    let name = name.unwrap_or_default();
    if name.chars().count() > MAX_NAME_CHARS {
        errors.add("name", too_long(MAX_NAME_CHARS));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(StorageBackend::in_memory())
    }

    fn new_user<'a>(email: &'a str, password: &'a str) -> NewUser<'a> {
        NewUser {
            email: Some(email),
            password: Some(password),
            name: Some("Ada"),
        }
    }

    fn validation(err: RegisterError) -> ValidationErrors {
        match err {
            RegisterError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let store = store();
        let user = store
            .register(new_user("ada@example.com", "hunter22"))
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_ne!(user.password_hash, "hunter22");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert!(store.verify_password(&user, "hunter22"));
        assert!(!store.verify_password(&user, "hunter23"));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = store();
        store
            .register(new_user("ada@example.com", "pw"))
            .await
            .unwrap();

        let errors = validation(
            store
                .register(new_user("ada@example.com", "other"))
                .await
                .unwrap_err(),
        );
        assert_eq!(errors.get("email"), Some(&[DUPLICATE_EMAIL.to_string()][..]));
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported_together() {
        let errors = validation(store().register(NewUser::default()).await.unwrap_err());

        assert_eq!(errors.get("email"), Some(&[FIELD_REQUIRED.to_string()][..]));
        assert_eq!(errors.get("password"), Some(&[FIELD_REQUIRED.to_string()][..]));
        assert!(errors.get("name").is_none());
    }

    #[tokio::test]
    async fn test_malformed_fields() {
        let long_name = "n".repeat(MAX_NAME_CHARS + 1);
        let errors = validation(
            store()
                .register(NewUser {
                    email: Some("not an email"),
                    password: Some(""),
                    name: Some(&long_name),
                })
                .await
                .unwrap_err(),
        );

        assert_eq!(errors.get("email"), Some(&[INVALID_EMAIL.to_string()][..]));
        assert_eq!(errors.get("password"), Some(&[FIELD_BLANK.to_string()][..]));
        assert_eq!(errors.get("name"), Some(&[too_long(MAX_NAME_CHARS)][..]));
    }

    #[tokio::test]
    async fn test_length_limits_count_characters() {
        // 255 characters, 765 bytes
        let name = "\u{4e2d}\u{6587}\u{5b57}".repeat(85);
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
        let user = store()
            .register(NewUser {
                email: Some("wide@example.com"),
                password: Some("pw"),
                name: Some(&name),
            })
            .await
            .unwrap();
        assert_eq!(user.name, name);

        let too_wide = format!("{name}\u{4e2d}");
        let errors = validation(
            store()
                .register(NewUser {
                    email: Some("wider@example.com"),
                    password: Some("pw"),
                    name: Some(&too_wide),
                })
                .await
                .unwrap_err(),
        );
        assert_eq!(errors.get("name"), Some(&[too_long(MAX_NAME_CHARS)][..]));
    }

    #[tokio::test]
    async fn test_name_is_optional() {
        let user = store()
            .register(NewUser {
                email: Some("anon@example.com"),
                password: Some("pw"),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(user.name, "");
    }

    #[test]
    fn test_email_shape() {
        for ok in ["a@b.co", "first.last+tag@sub.example.org"] {
            assert!(EMAIL_SHAPE.is_match(ok), "{ok}");
        }
        for bad in ["a@b", "@b.co", "a b@c.de", "a@@b.co", "plain"] {
            assert!(!EMAIL_SHAPE.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn test_validation_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::default();
        errors.add("email", INVALID_EMAIL);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"email": ["Enter a valid email address."]}));
    }
}
