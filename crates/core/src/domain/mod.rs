// Domain Layer - Pure queue selection logic and value types

pub mod error;
pub mod job;
pub mod poll_order;
pub mod queue;
pub mod specifier;

// Re-exports
pub use error::DomainError;
pub use job::{FetchedJob, JobId, JobPayload};
pub use poll_order::PollOrder;
pub use queue::{queue_key, queue_name_from_key, validate_queue_name, ExpansionResult, QueueName};
pub use specifier::{
    has_dynamic_syntax, translate_from_cli, wildcard_regex, QueueSpecifier, SpecifierKind,
};
