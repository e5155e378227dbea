// Dynamic Queue Registry
//
// Key -> specifier list, stored as JSON arrays in a DynamicQueueStore.
// Lookups fall back to the reserved "default" key, then to a caller default.

use crate::error::Result;
use crate::port::DynamicQueueStore;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reserved key consulted when a requested key has no specifiers
pub const FALLBACK_KEY: &str = "default";

/// Specifier used when neither the key nor the fallback key is stored
pub const DEFAULT_SPECIFIER: &str = "*";

pub fn default_specifiers() -> Vec<String> {
    vec![DEFAULT_SPECIFIER.to_string()]
}

/// Synchronous specifier lookup used during expansion
pub trait SpecifierSource: Send + Sync {
    /// Specifiers for `key` after the fallback chain (never errors)
    fn specifiers_for(&self, key: &str) -> Vec<String>;
}

/// Registry service over an injected store
pub struct DynamicQueueRegistry {
    store: Arc<dyn DynamicQueueStore>,
}

impl DynamicQueueRegistry {
    pub fn new(store: Arc<dyn DynamicQueueStore>) -> Self {
        Self { store }
    }

    /// Specifiers for `key`, defaulting to `["*"]`
    pub async fn get(&self, key: &str) -> Result<Vec<String>> {
        self.get_or(key, &default_specifiers()).await
    }

    /// Specifiers for `key`; falls back to the "default" key, then to `default`
    pub async fn get_or(&self, key: &str, default: &[String]) -> Result<Vec<String>> {
        let stored = self.load(key).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        let fallback = self.load(FALLBACK_KEY).await?;
        if !fallback.is_empty() {
            debug!(key = %key, "Dynamic queue key not set, using fallback key");
            return Ok(fallback);
        }

        Ok(default.to_vec())
    }

    /// Store specifiers for `key`; an empty list removes the key
    pub async fn set(&self, key: &str, specifiers: &[String]) -> Result<()> {
        if specifiers.is_empty() {
            info!(key = %key, "Removing dynamic queue entry");
            return self.store.delete(key).await;
        }

        let value = serde_json::to_string(specifiers)?;
        info!(key = %key, specifiers = ?specifiers, "Setting dynamic queue entry");
        self.store.put(key, &value).await
    }

    /// Atomically replace the whole registry; empty lists are skipped
    pub async fn replace_all(&self, mapping: &BTreeMap<String, Vec<String>>) -> Result<()> {
        let mut entries = Vec::with_capacity(mapping.len());
        for (key, specifiers) in mapping {
            if specifiers.is_empty() {
                continue;
            }
            entries.push((key.clone(), serde_json::to_string(specifiers)?));
        }

        info!(keys = entries.len(), "Replacing all dynamic queue entries");
        self.store.replace_all(&entries).await
    }

    /// Every stored entry; always includes the fallback key
    pub async fn get_all(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut result: BTreeMap<String, Vec<String>> = self
            .store
            .get_all()
            .await?
            .into_iter()
            .map(|(key, raw)| {
                let specifiers = decode(&key, &raw);
                (key, specifiers)
            })
            .collect();

        result
            .entry(FALLBACK_KEY.to_string())
            .or_insert_with(default_specifiers);
        Ok(result)
    }

    /// Read the whole registry once for a fetch cycle
    pub async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let entries = self
            .store
            .get_all()
            .await?
            .into_iter()
            .map(|(key, raw)| {
                let specifiers = decode(&key, &raw);
                (key, specifiers)
            })
            .collect();
        Ok(RegistrySnapshot { entries })
    }

    async fn load(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .get(key)
            .await?
            .map(|raw| decode(key, &raw))
            .unwrap_or_default())
    }
}

/// Point-in-time copy of the registry
///
/// A fetch cycle expands against one snapshot so that nested references see
/// a consistent registry even while an operator replaces it.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    entries: HashMap<String, Vec<String>>,
}

impl RegistrySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    fn stored(&self, key: &str) -> Option<&Vec<String>> {
        self.entries.get(key).filter(|list| !list.is_empty())
    }
}

impl SpecifierSource for RegistrySnapshot {
    fn specifiers_for(&self, key: &str) -> Vec<String> {
        self.stored(key)
            .or_else(|| self.stored(FALLBACK_KEY))
            .cloned()
            .unwrap_or_else(default_specifiers)
    }
}

/// Malformed values read as an empty list so a bad entry never stops fetching
fn decode(key: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(e) => {
            warn!(key = %key, error = %e, "Malformed dynamic queue entry, treating as empty");
            Vec::new()
        }
    }
}
