//! In-memory durable store, for tests and for hosts without persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::DurableStore;
use crate::error::StoreError;

/// `HashMap`-backed store.
///
/// Can be switched into a failing mode in which every operation returns
/// [`StoreError::Unavailable`], to simulate a storage outage.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns a copy of the raw value under `key`, bypassing failure mode.
    pub fn raw(&self, key: &str) -> Option<Value> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(key).cloned()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is in failing mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let entries = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", json!({"a": 1})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        // Removing again is fine
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let store = MemoryStore::new();
        store.set("k", json!(1)).await.unwrap();
        store.set_failing(true);

        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.set("k", json!(2)).await.is_err());
        assert_eq!(store.raw("k"), Some(json!(1)));

        store.set_failing(false);
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));
    }
}
