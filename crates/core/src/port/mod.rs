// Port Layer - Interfaces for external collaborators

pub mod dynamic_queue_store;
pub mod host_identity;
pub mod job_dispatcher;
pub mod job_producer;
pub mod providers; // For deterministic testing
pub mod queue_catalog;
pub mod queue_poller;

// Re-exports
pub use dynamic_queue_store::DynamicQueueStore;
pub use host_identity::{HostIdentity, StaticHostIdentity};
pub use job_dispatcher::JobDispatcher;
pub use job_producer::{JobProducer, QueueSize};
pub use providers::{IdProvider, SystemTimeProvider, TimeProvider, UuidProvider};
pub use queue_catalog::QueueCatalog;
pub use queue_poller::QueuePoller;
