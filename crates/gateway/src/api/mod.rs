// HTTP API routes
//
// Each submodule owns one endpoint and its request/response types.

pub mod analyze;
pub mod common;
pub mod generate;

// Re-export common types
pub use common::{ApiError, ErrorResponse};
