//! Request log and mock tool persistence.
//!
//! The dispatcher only depends on the [`Store`] contract. Each engine
//! serialises its own writes so log ids stay strictly increasing even with
//! concurrent writers.

use async_trait::async_trait;

use crate::logs::{NewLogEntry, RequestLogEntry};
use crate::tools::ToolDefinition;

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Append-only request log plus CRUD for dynamically registered mock tools.
#[async_trait]
pub trait Store: Send + Sync {
    /// Appends an entry, evicting the oldest once the retention cap is reached.
    async fn append_log(&self, entry: NewLogEntry) -> Result<RequestLogEntry, StoreError>;

    /// Newest first.
    async fn list_logs(&self, limit: usize) -> Result<Vec<RequestLogEntry>, StoreError>;

    async fn clear_logs(&self) -> Result<(), StoreError>;

    /// Inserts or replaces a tool by name; `updated_at` is refreshed, `created_at` kept.
    async fn upsert_tool(&self, tool: ToolDefinition) -> Result<ToolDefinition, StoreError>;

    /// Returns whether a tool with that name existed.
    async fn delete_tool(&self, name: &str) -> Result<bool, StoreError>;

    /// Ordered by name.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, StoreError>;
}
