//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    ExpandRequest, ExpandResponse, GetDynamicRequest, GetDynamicResponse, ListDynamicRequest,
    ListDynamicResponse, ListQueuesRequest, ListQueuesResponse, PushRequest, PushResponse,
    ReplaceAllRequest, ReplaceAllResponse, SetDynamicRequest, SetDynamicResponse,
};
use dynaq_core::application::{DynamicQueueRegistry, WeightedQueueSelector};
use dynaq_core::domain::specifier::REFERENCE_PREFIX;
use dynaq_core::domain::{translate_from_cli, JobPayload};
use dynaq_core::port::{HostIdentity, JobProducer, QueueCatalog};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    registry: Arc<DynamicQueueRegistry>,
    selector: Arc<WeightedQueueSelector>,
    producer: Arc<dyn JobProducer>,
    catalog: Arc<dyn QueueCatalog>,
    host: Arc<dyn HostIdentity>,
}

impl RpcHandler {
    pub fn new(
        registry: Arc<DynamicQueueRegistry>,
        selector: Arc<WeightedQueueSelector>,
        producer: Arc<dyn JobProducer>,
        catalog: Arc<dyn QueueCatalog>,
        host: Arc<dyn HostIdentity>,
    ) -> Self {
        Self {
            registry,
            selector,
            producer,
            catalog,
            host,
        }
    }

    /// queue.push.v1
    pub async fn push(&self, params: PushRequest) -> Result<PushResponse, ErrorObjectOwned> {
        let job = self
            .producer
            .push(&params.queue, JobPayload::new(params.payload))
            .await
            .map_err(to_rpc_error)?;

        Ok(PushResponse {
            job_id: job.id,
            queue: job.queue,
            enqueued_at: job.enqueued_at,
        })
    }

    /// queue.list.v1
    pub async fn list_queues(
        &self,
        _params: ListQueuesRequest,
    ) -> Result<ListQueuesResponse, ErrorObjectOwned> {
        let queues = self.producer.queue_sizes().await.map_err(to_rpc_error)?;
        Ok(ListQueuesResponse { queues })
    }

    /// dynamic.get.v1
    pub async fn get_dynamic(
        &self,
        params: GetDynamicRequest,
    ) -> Result<GetDynamicResponse, ErrorObjectOwned> {
        let key = params.key.unwrap_or_else(|| self.host.hostname());
        let specifiers = self.registry.get(&key).await.map_err(to_rpc_error)?;
        Ok(GetDynamicResponse { key, specifiers })
    }

    /// dynamic.set.v1
    pub async fn set_dynamic(
        &self,
        params: SetDynamicRequest,
    ) -> Result<SetDynamicResponse, ErrorObjectOwned> {
        let specifiers = translate_all(&params.specifiers);
        self.registry
            .set(&params.key, &specifiers)
            .await
            .map_err(to_rpc_error)?;

        Ok(SetDynamicResponse {
            key: params.key,
            removed: specifiers.is_empty(),
            specifiers,
        })
    }

    /// dynamic.replace_all.v1
    pub async fn replace_all(
        &self,
        params: ReplaceAllRequest,
    ) -> Result<ReplaceAllResponse, ErrorObjectOwned> {
        let entries: std::collections::BTreeMap<String, Vec<String>> = params
            .entries
            .into_iter()
            .map(|(key, specifiers)| (key, translate_all(&specifiers)))
            .collect();

        self.registry
            .replace_all(&entries)
            .await
            .map_err(to_rpc_error)?;

        Ok(ReplaceAllResponse {
            keys_written: entries.values().filter(|s| !s.is_empty()).count(),
        })
    }

    /// dynamic.list.v1
    pub async fn list_dynamic(
        &self,
        _params: ListDynamicRequest,
    ) -> Result<ListDynamicResponse, ErrorObjectOwned> {
        let entries = self.registry.get_all().await.map_err(to_rpc_error)?;
        Ok(ListDynamicResponse { entries })
    }

    /// queue.expand.v1
    pub async fn expand(&self, params: ExpandRequest) -> Result<ExpandResponse, ErrorObjectOwned> {
        let specifiers = if !params.specifiers.is_empty() {
            translate_all(&params.specifiers)
        } else {
            let key = params.key.unwrap_or_default();
            vec![format!("{}{}", REFERENCE_PREFIX, key)]
        };

        let real_queues = self.catalog.list_queues().await.map_err(to_rpc_error)?;
        let (weights, order) = self
            .selector
            .preview(&specifiers, &real_queues, params.strict)
            .await
            .map_err(to_rpc_error)?;

        info!(
            specifiers = ?specifiers,
            queues = weights.len(),
            "Expansion preview"
        );

        Ok(ExpandResponse {
            specifiers,
            weights,
            poll_order: order.queue_keys().to_vec(),
        })
    }
}

fn translate_all(specifiers: &[String]) -> Vec<String> {
    specifiers.iter().map(|s| translate_from_cli(s)).collect()
}
