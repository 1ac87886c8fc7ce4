// Storage layer for the gateway
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// Only user accounts are stored; tokens are stateless.

pub mod backend;
pub mod error;
pub mod memory;
pub mod models;
pub mod password;
pub mod repositories;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryDatabase;
pub use models::{CreateUserRow, UserRow};
pub use repositories::Database;
