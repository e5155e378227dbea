// Job Producer Port (Interface)

use crate::domain::{FetchedJob, JobPayload, QueueName};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pending job count of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSize {
    pub name: QueueName,
    pub pending: i64,
}

/// Producer side of the job system
#[async_trait]
pub trait JobProducer: Send + Sync {
    /// Append a job to `queue`, creating the queue on first use
    async fn push(&self, queue: &str, payload: JobPayload) -> Result<FetchedJob>;

    /// Every known queue with its pending count, ordered by name
    async fn queue_sizes(&self) -> Result<Vec<QueueSize>>;
}

pub mod mocks {
    use super::*;
    use crate::domain::validate_queue_name;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Producer that keeps jobs per queue in memory
    #[derive(Default)]
    pub struct InMemoryProducer {
        queues: Mutex<BTreeMap<QueueName, Vec<FetchedJob>>>,
    }

    impl InMemoryProducer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn jobs(&self, queue: &str) -> Vec<FetchedJob> {
            self.queues
                .lock()
                .unwrap()
                .get(queue)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl JobProducer for InMemoryProducer {
        async fn push(&self, queue: &str, payload: JobPayload) -> Result<FetchedJob> {
            validate_queue_name(queue)?;
            let mut queues = self.queues.lock().unwrap();
            let jobs = queues.entry(queue.to_string()).or_default();
            let job = FetchedJob {
                id: format!("{}-{}", queue, jobs.len() + 1),
                queue: queue.to_string(),
                payload,
                enqueued_at: 0,
            };
            jobs.push(job.clone());
            Ok(job)
        }

        async fn queue_sizes(&self) -> Result<Vec<QueueSize>> {
            Ok(self
                .queues
                .lock()
                .unwrap()
                .iter()
                .map(|(name, jobs)| QueueSize {
                    name: name.clone(),
                    pending: jobs.len() as i64,
                })
                .collect())
        }
    }
}
