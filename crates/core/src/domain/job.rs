// Job Domain Model
//
// The payload is opaque to queue selection; only its queue matters here.

use serde::{Deserialize, Serialize};

use super::queue::QueueName;

/// Job ID (UUID v4)
pub type JobId = String;

/// Job Payload (JSON, never inspected by the fetcher)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(serde_json::Value);

impl JobPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// A job popped off a queue by the poller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedJob {
    pub id: JobId,
    pub queue: QueueName,
    pub payload: JobPayload,
    pub enqueued_at: i64, // epoch ms
}
