//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use dynaq_core::domain::ExpansionResult;
use dynaq_core::port::QueueSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// queue.push.v1 - Push a job onto a queue
#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub queue: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushResponse {
    pub job_id: String,
    pub queue: String,
    pub enqueued_at: i64,
}

/// queue.list.v1 - Real queues with pending counts
#[derive(Debug, Default, Deserialize)]
pub struct ListQueuesRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct ListQueuesResponse {
    pub queues: Vec<QueueSize>,
}

/// dynamic.get.v1 - Specifiers stored for a key (after fallback)
///
/// Without a key the worker's hostname is used.
#[derive(Debug, Default, Deserialize)]
pub struct GetDynamicRequest {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetDynamicResponse {
    pub key: String,
    pub specifiers: Vec<String>,
}

/// dynamic.set.v1 - Store specifiers for one key; empty list removes it
#[derive(Debug, Deserialize)]
pub struct SetDynamicRequest {
    pub key: String,
    #[serde(default)]
    pub specifiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetDynamicResponse {
    pub key: String,
    pub specifiers: Vec<String>,
    pub removed: bool,
}

/// dynamic.replace_all.v1 - Atomically replace the registry
#[derive(Debug, Deserialize)]
pub struct ReplaceAllRequest {
    pub entries: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaceAllResponse {
    pub keys_written: usize,
}

/// dynamic.list.v1 - Whole registry
#[derive(Debug, Default, Deserialize)]
pub struct ListDynamicRequest {}

#[derive(Debug, Clone, Serialize)]
pub struct ListDynamicResponse {
    pub entries: BTreeMap<String, Vec<String>>,
}

/// queue.expand.v1 - Preview weights and a poll order
///
/// `specifiers` wins over `key`; with neither, the worker's own `@` entry
/// is expanded.
#[derive(Debug, Default, Deserialize)]
pub struct ExpandRequest {
    #[serde(default)]
    pub specifiers: Vec<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpandResponse {
    pub specifiers: Vec<String>,
    pub weights: ExpansionResult,
    pub poll_order: Vec<String>,
}
