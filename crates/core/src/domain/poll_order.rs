// Poll Order - what a fetch cycle hands to the blocking pop

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::queue::{queue_key, queue_name_from_key};

/// Default blocking-pop timeout (seconds) appended as the trailing sentinel
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 2;

/// Ordered, de-duplicated queue keys plus the pop timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOrder {
    queue_keys: Vec<String>,
    timeout_secs: u64,
}

impl PollOrder {
    /// Build from queue names; duplicates keep their first position
    pub fn from_names<I, S>(names: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queue_keys: Vec<String> = Vec::new();
        for name in names {
            let key = queue_key(name.as_ref());
            if !queue_keys.contains(&key) {
                queue_keys.push(key);
            }
        }
        Self {
            queue_keys,
            timeout_secs: timeout.as_secs(),
        }
    }

    pub fn queue_keys(&self) -> &[String] {
        &self.queue_keys
    }

    /// Queue names without the key prefix, in poll order
    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.queue_keys.iter().map(|k| queue_name_from_key(k))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Keys followed by the timeout sentinel, the argument list of a blocking pop
    pub fn to_command(&self) -> Vec<String> {
        let mut command = self.queue_keys.clone();
        command.push(self.timeout_secs.to_string());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names_dedups_and_prefixes() {
        let order = PollOrder::from_names(["b", "a", "b"], Duration::from_secs(2));
        assert_eq!(order.queue_keys(), &["queue:b", "queue:a"]);
        assert_eq!(order.queue_names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_to_command_appends_timeout_sentinel() {
        let order = PollOrder::from_names(["mail"], Duration::from_secs(5));
        assert_eq!(order.to_command(), vec!["queue:mail", "5"]);
    }
}
