// Host Identity Port
//
// `@` references without a key resolve to this identifier.

/// Identifier of the host the worker runs on
pub trait HostIdentity: Send + Sync {
    fn hostname(&self) -> String;
}

/// Fixed identifier (tests, or an operator override)
#[derive(Debug, Clone)]
pub struct StaticHostIdentity(String);

impl StaticHostIdentity {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }
}

impl HostIdentity for StaticHostIdentity {
    fn hostname(&self) -> String {
        self.0.clone()
    }
}
