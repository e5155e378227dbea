// Queue Catalog Port (Interface)

use crate::domain::QueueName;
use crate::error::Result;
use async_trait::async_trait;

/// Lists the queues currently known to the job system
#[async_trait]
pub trait QueueCatalog: Send + Sync {
    /// Real queue names in ascending order (wildcard match order depends on it)
    async fn list_queues(&self) -> Result<Vec<QueueName>>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Catalog over a fixed, replaceable list
    pub struct StaticQueueCatalog {
        queues: Mutex<Vec<QueueName>>,
    }

    impl StaticQueueCatalog {
        pub fn new<S: Into<QueueName>>(queues: impl IntoIterator<Item = S>) -> Self {
            let mut queues: Vec<QueueName> = queues.into_iter().map(Into::into).collect();
            queues.sort();
            Self {
                queues: Mutex::new(queues),
            }
        }

        pub fn set_queues(&self, queues: Vec<QueueName>) {
            *self.queues.lock().unwrap() = queues;
        }
    }

    #[async_trait]
    impl QueueCatalog for StaticQueueCatalog {
        async fn list_queues(&self) -> Result<Vec<QueueName>> {
            Ok(self.queues.lock().unwrap().clone())
        }
    }
}
