//! JSON-RPC API Layer
//!
//! Producer and registry administration API for Dynaq workers.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
