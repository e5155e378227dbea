// Queue Poller Port (Interface)
//
// The blocking pop itself lives outside the selection core.

use crate::domain::{FetchedJob, PollOrder};
use crate::error::Result;
use async_trait::async_trait;

/// Pops the next job following a poll order
#[async_trait]
pub trait QueuePoller: Send + Sync {
    /// Pop from the first non-empty queue in `order`, waiting up to
    /// `order.timeout()`; `None` when every queue stayed empty
    async fn fetch(&self, order: &PollOrder) -> Result<Option<FetchedJob>>;
}

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Poller over in-memory jobs that records every order it received
    #[derive(Default)]
    pub struct RecordingPoller {
        jobs: Mutex<VecDeque<FetchedJob>>,
        orders: Mutex<Vec<PollOrder>>,
    }

    impl RecordingPoller {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, job: FetchedJob) {
            self.jobs.lock().unwrap().push_back(job);
        }

        pub fn orders(&self) -> Vec<PollOrder> {
            self.orders.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueuePoller for RecordingPoller {
        async fn fetch(&self, order: &PollOrder) -> Result<Option<FetchedJob>> {
            self.orders.lock().unwrap().push(order.clone());

            let mut jobs = self.jobs.lock().unwrap();
            for name in order.queue_names() {
                if let Some(pos) = jobs.iter().position(|j| j.queue == name) {
                    return Ok(jobs.remove(pos));
                }
            }
            Ok(None)
        }
    }
}
