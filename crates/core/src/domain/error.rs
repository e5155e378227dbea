// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A registry key that (directly or transitively) references itself
    #[error("Dynamic queue reference cycle: {}", chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    #[error("Dynamic queue references nested deeper than {max_depth} at key '{key}'")]
    ReferenceDepthExceeded { key: String, max_depth: usize },

    #[error("Invalid weight suffix in queue specifier: {0}")]
    InvalidWeight(String),

    #[error("Weight overflow while expanding queue specifiers: {0}")]
    WeightOverflow(String),

    #[error("Invalid queue pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Configuration errors are caused by registry or worker setup, not by transient state
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DomainError::ReferenceCycle { .. }
                | DomainError::ReferenceDepthExceeded { .. }
                | DomainError::InvalidWeight(_)
                | DomainError::InvalidPattern { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
