// Application Layer - Use Cases

pub mod expander;
pub mod fetch;
pub mod registry;
pub mod selector;

// Re-exports
pub use expander::QueueExpander;
pub use fetch::{shutdown_channel, DynamicFetcher, ShutdownSender, ShutdownToken};
pub use registry::{DynamicQueueRegistry, RegistrySnapshot, SpecifierSource};
pub use selector::{SelectorConfig, WeightedQueueSelector};
