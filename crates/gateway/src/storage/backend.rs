// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// A StorageBackend is either PostgreSQL (production) or in-memory (dev mode).

use std::sync::Arc;
use uuid::Uuid;

use super::error::StorageResult;
use super::memory::InMemoryDatabase;
use super::models::{CreateUserRow, UserRow};
use super::repositories::Database;

#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL database (production)
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    /// Create a PostgreSQL storage backend from a database URL, running migrations
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::from_url(database_url).await?;
        Ok(Self::Postgres(db))
    }

    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    /// Short name reported by the health endpoint
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::InMemory(_) => "memory",
        }
    }

    pub async fn create_user(&self, input: CreateUserRow) -> StorageResult<UserRow> {
        match self {
            Self::Postgres(db) => db.create_user(input).await,
            Self::InMemory(db) => db.create_user(input).await,
        }
    }

    pub async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user_by_email(email).await,
            Self::InMemory(db) => db.get_user_by_email(email).await,
        }
    }

    pub async fn get_user(&self, id: Uuid) -> StorageResult<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user(id).await,
            Self::InMemory(db) => db.get_user(id).await,
        }
    }
}
