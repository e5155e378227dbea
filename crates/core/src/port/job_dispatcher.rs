// Job Dispatcher Port (Interface)

use crate::domain::FetchedJob;
use crate::error::Result;
use async_trait::async_trait;

/// Receives jobs the fetch loop popped; execution is out of the fetcher's hands
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job: FetchedJob) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Collects dispatched jobs for assertions
    #[derive(Default)]
    pub struct CollectingDispatcher {
        jobs: Mutex<Vec<FetchedJob>>,
    }

    impl CollectingDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn jobs(&self) -> Vec<FetchedJob> {
            self.jobs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobDispatcher for CollectingDispatcher {
        async fn dispatch(&self, job: FetchedJob) -> Result<()> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }
}
