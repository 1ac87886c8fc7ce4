// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Used when DATABASE_URL is unset. All users are lost on restart.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::{StorageError, StorageResult};
use super::models::{CreateUserRow, UserRow};

#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<Uuid, UserRow>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user. The email check and the insert happen under one write lock.
    pub async fn create_user(&self, input: CreateUserRow) -> StorageResult<UserRow> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email == input.email) {
            return Err(StorageError::DuplicateEmail);
        }

        let now = Utc::now();
        let id = Uuid::now_v7();
        let row = UserRow {
            id,
            email: input.email,
            name: input.name,
            password_hash: input.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, row.clone());
        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<UserRow>> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    pub async fn get_user(&self, id: Uuid) -> StorageResult<Option<UserRow>> {
        Ok(self.users.read().get(&id).cloned())
    }
}
