// Dynaq Infrastructure - System Adapters
// Implements: HostIdentity

pub mod host_identity_impl;

pub use host_identity_impl::SystemHostIdentity;
