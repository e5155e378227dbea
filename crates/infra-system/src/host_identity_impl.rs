// Host identity implementation
// reason: sysinfo for cross-platform hostname lookup
use sysinfo::System;
use tracing::{debug, warn};

use dynaq_core::port::HostIdentity;

/// Used when the OS does not report a hostname
pub const UNKNOWN_HOSTNAME: &str = "localhost";

/// Host identity resolved from the operating system
///
/// The name is looked up once; a worker keeps the same `@` key for its
/// whole lifetime.
#[derive(Debug, Clone)]
pub struct SystemHostIdentity {
    hostname: String,
}

impl SystemHostIdentity {
    pub fn new() -> Self {
        Self::from_lookup(System::host_name())
    }

    /// Prefer an operator-supplied name over the OS lookup
    pub fn with_override(hostname: Option<String>) -> Self {
        match hostname {
            Some(name) if !name.trim().is_empty() => {
                debug!(hostname = %name.trim(), "Using configured hostname");
                Self {
                    hostname: name.trim().to_string(),
                }
            }
            _ => Self::new(),
        }
    }

    fn from_lookup(lookup: Option<String>) -> Self {
        let hostname = match lookup.map(|h| h.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            _ => {
                warn!(
                    fallback = UNKNOWN_HOSTNAME,
                    "Hostname unavailable, using fallback"
                );
                UNKNOWN_HOSTNAME.to_string()
            }
        };
        debug!(hostname = %hostname, "Host identity resolved");
        Self { hostname }
    }
}

impl Default for SystemHostIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIdentity for SystemHostIdentity {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_hostname_is_never_empty() {
        let identity = SystemHostIdentity::new();
        assert!(!identity.hostname().is_empty());
    }

    #[test]
    fn test_missing_hostname_falls_back() {
        assert_eq!(
            SystemHostIdentity::from_lookup(None).hostname(),
            UNKNOWN_HOSTNAME
        );
        assert_eq!(
            SystemHostIdentity::from_lookup(Some("  ".to_string())).hostname(),
            UNKNOWN_HOSTNAME
        );
    }

    #[test]
    fn test_override_wins_when_set() {
        let identity = SystemHostIdentity::with_override(Some(" worker-7 ".to_string()));
        assert_eq!(identity.hostname(), "worker-7");

        let identity = SystemHostIdentity::with_override(Some(String::new()));
        assert!(!identity.hostname().is_empty());
    }
}
