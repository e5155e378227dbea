// Queue Domain Model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};

/// Concrete queue name known to the job system
pub type QueueName = String;

/// Prefix of a fully-qualified queue key handed to the poller
pub const QUEUE_KEY_PREFIX: &str = "queue:";

/// Queue polled when selection yields nothing
pub const FALLBACK_QUEUE: &str = "default";

/// Maximum queue name length accepted from producers
pub const MAX_QUEUE_NAME_LEN: usize = 64;

/// Format a queue name as its fully-qualified key
pub fn queue_key(name: &str) -> String {
    format!("{}{}", QUEUE_KEY_PREFIX, name)
}

/// Strip the key prefix again (keys without the prefix are returned unchanged)
pub fn queue_name_from_key(key: &str) -> &str {
    key.strip_prefix(QUEUE_KEY_PREFIX).unwrap_or(key)
}

/// Validate a concrete queue name before a job is pushed onto it
///
/// Specifier syntax (`*`, leading `!` or `@`) is rejected so that real queue
/// names never read as patterns.
pub fn validate_queue_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DomainError::ValidationError(
            "Queue name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_QUEUE_NAME_LEN {
        return Err(DomainError::ValidationError(format!(
            "Queue name too long (max {} characters)",
            MAX_QUEUE_NAME_LEN
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(DomainError::ValidationError(format!(
            "Queue name '{}' must be alphanumeric with '_', '-' or '.'",
            name
        )));
    }
    Ok(())
}

/// Weighted mapping of concrete queue name to a positive weight
///
/// Iteration order is the order in which names were first contributed,
/// which is the priority order used for strict polling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionResult(IndexMap<QueueName, u64>);

impl ExpansionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add weight to a queue, inserting it at the end if unseen
    pub fn add(&mut self, name: impl Into<QueueName>, weight: u64) -> Result<()> {
        let name = name.into();
        let slot = self.0.entry(name.clone()).or_insert(0);
        *slot = slot
            .checked_add(weight)
            .ok_or_else(|| DomainError::WeightOverflow(format!("summing weight of '{}'", name)))?;
        Ok(())
    }

    /// Drop every queue whose summed weight is zero
    pub fn retain_positive(&mut self) {
        self.0.retain(|_, weight| *weight > 0);
    }

    pub fn weight(&self, name: &str) -> Option<u64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn into_inner(self) -> IndexMap<QueueName, u64> {
        self.0
    }
}

impl<N: Into<QueueName>> FromIterator<(N, u64)> for ExpansionResult {
    fn from_iter<I: IntoIterator<Item = (N, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, w)| (n.into(), w)).collect())
    }
}
