// Dynamic Queue Store Port (Interface)
//
// Hash-like key/value storage for serialized specifier lists.
// Values are opaque strings here; encoding belongs to the registry.

use crate::error::Result;
use async_trait::async_trait;

/// Backing store for the dynamic queue registry
#[async_trait]
pub trait DynamicQueueStore: Send + Sync {
    /// Raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` (no-op if absent)
    async fn delete(&self, key: &str) -> Result<()>;

    /// Every stored key/value pair
    async fn get_all(&self) -> Result<Vec<(String, String)>>;

    /// Clear the store and insert `entries` in one transaction
    ///
    /// Concurrent readers must observe either the previous or the new
    /// contents, never a mix.
    async fn replace_all(&self, entries: &[(String, String)]) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory store; a single lock makes `replace_all` atomic
    #[derive(Default)]
    pub struct InMemoryQueueStore {
        entries: Mutex<BTreeMap<String, String>>,
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a raw (possibly malformed) value
        pub fn insert_raw(&self, key: &str, value: &str) {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl DynamicQueueStore for InMemoryQueueStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, value: &str) -> Result<()> {
            self.insert_raw(key, value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn get_all(&self) -> Result<Vec<(String, String)>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }

        async fn replace_all(&self, entries: &[(String, String)]) -> Result<()> {
            let mut guard = self.entries.lock().unwrap();
            guard.clear();
            guard.extend(entries.iter().cloned());
            Ok(())
        }
    }
}
