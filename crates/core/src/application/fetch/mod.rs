// Fetcher - dynamic queue fetch loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::selector::WeightedQueueSelector;
use crate::domain::{translate_from_cli, FetchedJob};
use crate::error::Result;
use crate::port::{JobDispatcher, QueueCatalog, QueuePoller};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Fetches jobs using dynamic, weighted queue selection
pub struct DynamicFetcher {
    specifiers: Vec<String>,
    strict: bool,
    catalog: Arc<dyn QueueCatalog>,
    selector: Arc<WeightedQueueSelector>,
    poller: Arc<dyn QueuePoller>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl DynamicFetcher {
    /// Create a fetcher; CLI-escaped specifier tokens are translated here
    pub fn new(
        specifiers: Vec<String>,
        strict: bool,
        catalog: Arc<dyn QueueCatalog>,
        selector: Arc<WeightedQueueSelector>,
        poller: Arc<dyn QueuePoller>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        let specifiers = specifiers.iter().map(|s| translate_from_cli(s)).collect();
        Self {
            specifiers,
            strict,
            catalog,
            selector,
            poller,
            dispatcher,
        }
    }

    pub fn specifiers(&self) -> &[String] {
        &self.specifiers
    }

    /// Run fetch loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(specifiers = ?self.specifiers, strict = self.strict, "Fetcher started");
        loop {
            if shutdown.is_shutdown() {
                info!("Fetcher shutting down");
                break;
            }
            let pause = match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => IDLE_SLEEP_DURATION,
                Err(e) if e.is_configuration_error() => {
                    error!(error = %e, "Dynamic queue configuration error, fix the registry");
                    CONFIG_ERROR_SLEEP_DURATION
                }
                Err(e) => {
                    error!(error = %e, "Fetch cycle failed");
                    ERROR_RECOVERY_SLEEP_DURATION
                }
            };
            tokio::select! {
                _ = sleep(pause) => {},
                _ = shutdown.wait() => {
                    info!("Fetcher interrupted while waiting");
                    break;
                }
            }
        }
        info!("Fetcher stopped");
        Ok(())
    }

    /// One fetch cycle: list queues, order them, pop (returns the job, if any)
    pub async fn fetch_next(&self) -> Result<Option<FetchedJob>> {
        let real_queues = self.catalog.list_queues().await?;
        let order = self
            .selector
            .next_poll_order(&self.specifiers, &real_queues, self.strict)
            .await?;

        debug!(command = ?order.to_command(), "Polling queues");
        self.poller.fetch(&order).await
    }

    /// Fetch and dispatch one job (returns true if a job was dispatched)
    pub async fn process_next(&self) -> Result<bool> {
        let job = match self.fetch_next().await? {
            Some(job) => job,
            None => return Ok(false),
        };

        info!(job_id = %job.id, queue = %job.queue, "Fetched job");
        self.dispatcher.dispatch(job).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::DynamicQueueRegistry;
    use crate::application::selector::SelectorConfig;
    use crate::domain::JobPayload;
    use crate::port::dynamic_queue_store::mocks::InMemoryQueueStore;
    use crate::port::job_dispatcher::mocks::CollectingDispatcher;
    use crate::port::queue_catalog::mocks::StaticQueueCatalog;
    use crate::port::queue_poller::mocks::RecordingPoller;
    use crate::port::StaticHostIdentity;
    use std::time::Duration;

    struct Harness {
        registry: Arc<DynamicQueueRegistry>,
        poller: Arc<RecordingPoller>,
        dispatcher: Arc<CollectingDispatcher>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                registry: Arc::new(DynamicQueueRegistry::new(Arc::new(
                    InMemoryQueueStore::new(),
                ))),
                poller: Arc::new(RecordingPoller::new()),
                dispatcher: Arc::new(CollectingDispatcher::new()),
            }
        }

        fn fetcher(&self, specifiers: &[&str], queues: &[&str], strict: bool) -> DynamicFetcher {
            let selector = Arc::new(WeightedQueueSelector::new(
                self.registry.clone(),
                Arc::new(StaticHostIdentity::new("worker-1")),
                SelectorConfig::default(),
            ));
            DynamicFetcher::new(
                specifiers.iter().map(|s| s.to_string()).collect(),
                strict,
                Arc::new(StaticQueueCatalog::new(queues.iter().copied())),
                selector,
                self.poller.clone(),
                self.dispatcher.clone(),
            )
        }
    }

    fn job(id: &str, queue: &str) -> FetchedJob {
        FetchedJob {
            id: id.to_string(),
            queue: queue.to_string(),
            payload: JobPayload::new(serde_json::json!({})),
            enqueued_at: 0,
        }
    }

    #[test]
    fn test_cli_tokens_are_translated() {
        let harness = Harness::new();
        let fetcher = harness.fetcher(&[".star.", ".not.low.star.", ".at.web"], &[], false);
        assert_eq!(fetcher.specifiers(), &["*", "!low*", "@web"]);
    }

    #[tokio::test]
    async fn test_process_next_dispatches_in_strict_priority() {
        let harness = Harness::new();
        harness.poller.push(job("j1", "low"));
        harness.poller.push(job("j2", "high"));

        let fetcher = harness.fetcher(&["high*", "low*"], &["high", "low"], true);
        assert!(fetcher.process_next().await.unwrap());
        assert!(fetcher.process_next().await.unwrap());
        assert!(!fetcher.process_next().await.unwrap());

        let ids: Vec<String> = harness.dispatcher.jobs().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["j2", "j1"]);
        assert_eq!(
            harness.poller.orders()[0].to_command(),
            vec!["queue:high", "queue:low", "2"]
        );
    }

    #[tokio::test]
    async fn test_negated_queue_is_never_polled() {
        let harness = Harness::new();
        harness.poller.push(job("j1", "blocked"));

        let fetcher = harness.fetcher(&["*", "!blocked"], &["blocked", "open"], false);
        assert!(!fetcher.process_next().await.unwrap());
        assert_eq!(
            harness.poller.orders()[0].queue_keys(),
            &["queue:open"]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let harness = Harness::new();
        let fetcher = harness.fetcher(&["*"], &["a"], false);
        let (sender, token) = shutdown_channel();

        let handle = tokio::spawn(async move { fetcher.run(token).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("fetcher did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
