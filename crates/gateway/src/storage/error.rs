// Storage errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A user with this email is already stored
    #[error("user with this email already exists.")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Map a sqlx error to `DuplicateEmail` when it is a unique-constraint violation
pub(crate) fn map_unique_violation(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StorageError::DuplicateEmail,
        _ => StorageError::Database(err),
    }
}
