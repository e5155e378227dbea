// Weighted Queue Selector
//
// Turns configured specifiers into the poll order of one fetch cycle.

use crate::application::expander::{QueueExpander, MAX_REFERENCE_DEPTH};
use crate::application::registry::{DynamicQueueRegistry, RegistrySnapshot};
use crate::domain::poll_order::DEFAULT_POLL_TIMEOUT_SECS;
use crate::domain::queue::FALLBACK_QUEUE;
use crate::domain::specifier::{NEGATION_PREFIX, REFERENCE_PREFIX};
use crate::domain::{has_dynamic_syntax, ExpansionResult, PollOrder, QueueName};
use crate::error::Result;
use crate::port::HostIdentity;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Selector settings
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Timeout appended to every poll order for the blocking pop
    pub poll_timeout: Duration,
    /// Bound on nested `@key` references
    pub max_reference_depth: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
            max_reference_depth: MAX_REFERENCE_DEPTH,
        }
    }
}

/// Computes poll orders from specifiers, the live queue set and the registry
///
/// Holds no mutable state; share it behind an `Arc` across workers.
pub struct WeightedQueueSelector {
    registry: Arc<DynamicQueueRegistry>,
    host: Arc<dyn HostIdentity>,
    config: SelectorConfig,
}

impl WeightedQueueSelector {
    pub fn new(
        registry: Arc<DynamicQueueRegistry>,
        host: Arc<dyn HostIdentity>,
        config: SelectorConfig,
    ) -> Self {
        Self {
            registry,
            host,
            config,
        }
    }

    /// Expand specifiers against `real_queues`
    ///
    /// The registry is read once per call, and only when a specifier
    /// references it.
    pub async fn expand(
        &self,
        specifiers: &[String],
        real_queues: &[QueueName],
    ) -> Result<ExpansionResult> {
        let snapshot = if references_registry(specifiers) {
            self.registry.snapshot().await?
        } else {
            RegistrySnapshot::empty()
        };

        let host = self.host.hostname();
        let weights = QueueExpander::new(&snapshot, &host)
            .with_max_depth(self.config.max_reference_depth)
            .expand(specifiers, real_queues)?;
        Ok(weights)
    }

    /// Poll order for one fetch cycle
    ///
    /// Without dynamic syntax the configured names are polled as given:
    /// in declaration order when `strict`, uniformly shuffled otherwise.
    /// With dynamic syntax, `strict` polls in declaration order and
    /// otherwise queues are drawn by weight without replacement.
    pub async fn next_poll_order(
        &self,
        configured: &[String],
        real_queues: &[QueueName],
        strict: bool,
    ) -> Result<PollOrder> {
        if !has_dynamic_syntax(configured) {
            return Ok(static_order_with_thread_rng(
                configured,
                strict,
                self.config.poll_timeout,
            ));
        }

        let (_, order) = self.preview(configured, real_queues, strict).await?;
        debug!(
            strict = strict,
            queues = ?order.queue_keys(),
            "Computed dynamic poll order"
        );
        Ok(order)
    }

    /// Weights and the poll order drawn from them, from a single expansion
    pub async fn preview(
        &self,
        configured: &[String],
        real_queues: &[QueueName],
        strict: bool,
    ) -> Result<(ExpansionResult, PollOrder)> {
        let weights = self.expand(configured, real_queues).await?;
        let order = if has_dynamic_syntax(configured) {
            poll_order_with_thread_rng(&weights, strict, self.config.poll_timeout)
        } else {
            static_order_with_thread_rng(configured, strict, self.config.poll_timeout)
        };
        Ok((weights, order))
    }
}

/// Configured names, de-duplicated; shuffled unless `strict`
pub fn static_poll_order<R: Rng + ?Sized>(
    configured: &[String],
    strict: bool,
    timeout: Duration,
    rng: &mut R,
) -> PollOrder {
    if configured.is_empty() {
        return PollOrder::from_names([FALLBACK_QUEUE], timeout);
    }
    if strict {
        return PollOrder::from_names(configured, timeout);
    }
    let mut names: Vec<&str> = Vec::with_capacity(configured.len());
    for name in configured {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names.shuffle(rng);
    PollOrder::from_names(names, timeout)
}

/// Poll order from expansion weights (fallback queue when empty)
pub fn poll_order_from_weights<R: Rng + ?Sized>(
    weights: &ExpansionResult,
    strict: bool,
    timeout: Duration,
    rng: &mut R,
) -> PollOrder {
    let mut names: Vec<QueueName> = if strict {
        weights.names().map(str::to_string).collect()
    } else {
        weighted_shuffle(weights, rng)
    };

    if names.is_empty() {
        names.push(FALLBACK_QUEUE.to_string());
    }
    PollOrder::from_names(names, timeout)
}

// ThreadRng is !Send; keep it out of the async state machine
fn static_order_with_thread_rng(configured: &[String], strict: bool, timeout: Duration) -> PollOrder {
    static_poll_order(configured, strict, timeout, &mut rand::thread_rng())
}

fn poll_order_with_thread_rng(
    weights: &ExpansionResult,
    strict: bool,
    timeout: Duration,
) -> PollOrder {
    poll_order_from_weights(weights, strict, timeout, &mut rand::thread_rng())
}

/// Weighted sampling without replacement
///
/// Each draw picks a remaining queue with probability proportional to its
/// weight, then removes it from the pool.
pub fn weighted_shuffle<R: Rng + ?Sized>(weights: &ExpansionResult, rng: &mut R) -> Vec<QueueName> {
    let mut pool: Vec<(&str, u64)> = weights.iter().collect();
    let mut order = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let idx = pick_weighted(&pool, rng);
        order.push(pool.remove(idx).0.to_string());
    }
    order
}

/// Index of the entry whose cumulative weight first exceeds a uniform draw
fn pick_weighted<R: Rng + ?Sized>(pool: &[(&str, u64)], rng: &mut R) -> usize {
    // u128 so that sums of large weights cannot overflow
    let total: u128 = pool.iter().map(|(_, w)| u128::from(*w)).sum();
    if total == 0 {
        // only reachable with all-zero weights, which expansion excludes
        return 0;
    }

    let r = rng.gen_range(0..total);
    let mut cumulative = 0;
    for (idx, (_, weight)) in pool.iter().enumerate() {
        cumulative += u128::from(*weight);
        if r < cumulative {
            return idx;
        }
    }
    pool.len() - 1
}

fn references_registry(specifiers: &[String]) -> bool {
    specifiers.iter().any(|s| {
        s.strip_prefix(NEGATION_PREFIX)
            .unwrap_or(s)
            .starts_with(REFERENCE_PREFIX)
    })
}
