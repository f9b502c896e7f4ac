//! Durable key-value storage used by the background context.
//!
//! The store is string-keyed and holds JSON values. It survives process
//! restarts; nothing here assumes multi-key transactions.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::{default_database_path, SqliteStore};

/// Async, string-keyed persistent store.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns the value under `key`, or `None` if the key was never set.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
