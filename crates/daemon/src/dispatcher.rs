//! Dispatcher used by the standalone worker
//!
//! Job execution is pluggable; the bundled worker only records what it
//! fetched.

use async_trait::async_trait;
use dynaq_core::domain::FetchedJob;
use dynaq_core::error::Result;
use dynaq_core::port::{JobDispatcher, TimeProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct LoggingDispatcher {
    time_provider: Arc<dyn TimeProvider>,
    dispatched: AtomicU64,
}

impl LoggingDispatcher {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            time_provider,
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl JobDispatcher for LoggingDispatcher {
    async fn dispatch(&self, job: FetchedJob) -> Result<()> {
        let waited_ms = self.time_provider.now_millis() - job.enqueued_at;
        let total = self.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            job_id = %job.id,
            queue = %job.queue,
            waited_ms = waited_ms,
            payload = %job.payload.as_value(),
            total = total,
            "Job dispatched"
        );
        Ok(())
    }
}
