//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use crate::types::{
    ExpandRequest, GetDynamicRequest, ListDynamicRequest, ListQueuesRequest, PushRequest,
    ReplaceAllRequest, SetDynamicRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9633;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// Register `$name`, parsing params as `$req` and calling `handler.$method`
macro_rules! register {
    ($module:expr, $handler:expr, $name:literal, $req:ty, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Producer
        register!(module, self.handler, "queue.push.v1", PushRequest, push);
        register!(module, self.handler, "queue.list.v1", ListQueuesRequest, list_queues);
        register!(module, self.handler, "queue.expand.v1", ExpandRequest, expand);

        // Registry administration
        register!(module, self.handler, "dynamic.get.v1", GetDynamicRequest, get_dynamic);
        register!(module, self.handler, "dynamic.set.v1", SetDynamicRequest, set_dynamic);
        register!(
            module,
            self.handler,
            "dynamic.replace_all.v1",
            ReplaceAllRequest,
            replace_all
        );
        register!(module, self.handler, "dynamic.list.v1", ListDynamicRequest, list_dynamic);

        Ok(module)
    }

    /// Start the JSON-RPC server
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let module = self.module()?;
        info!(methods = module.method_names().count(), "JSON-RPC server started");

        Ok(server.start(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynaq_core::application::{DynamicQueueRegistry, SelectorConfig, WeightedQueueSelector};
    use dynaq_core::port::dynamic_queue_store::mocks::InMemoryQueueStore;
    use dynaq_core::port::job_producer::mocks::InMemoryProducer;
    use dynaq_core::port::queue_catalog::mocks::StaticQueueCatalog;
    use dynaq_core::port::{HostIdentity, StaticHostIdentity};
    use jsonrpsee::core::params::ObjectParams;

    fn server() -> RpcServer {
        let registry = Arc::new(DynamicQueueRegistry::new(Arc::new(
            InMemoryQueueStore::new(),
        )));
        let host: Arc<dyn HostIdentity> = Arc::new(StaticHostIdentity::new("worker-1"));
        let selector = Arc::new(WeightedQueueSelector::new(
            registry.clone(),
            host.clone(),
            SelectorConfig::default(),
        ));
        let handler = RpcHandler::new(
            registry,
            selector,
            Arc::new(InMemoryProducer::new()),
            Arc::new(StaticQueueCatalog::new(["mail", "reports"])),
            host,
        );
        RpcServer::new(RpcServerConfig::default(), handler)
    }

    #[test]
    fn test_default_config() {
        let config = RpcServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_RPC_PORT);
    }

    #[test]
    fn test_all_methods_registered() {
        let module = server().module().unwrap();
        let mut names: Vec<&str> = module.method_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "dynamic.get.v1",
                "dynamic.list.v1",
                "dynamic.replace_all.v1",
                "dynamic.set.v1",
                "queue.expand.v1",
                "queue.list.v1",
                "queue.push.v1",
            ]
        );
    }

    #[tokio::test]
    async fn test_expand_call_through_module() {
        let module = server().module().unwrap();
        let mut params = ObjectParams::new();
        params.insert("specifiers", vec!["*", "!reports"]).unwrap();
        params.insert("strict", true).unwrap();

        let response: serde_json::Value = module.call("queue.expand.v1", params).await.unwrap();

        assert_eq!(response["weights"], serde_json::json!({ "mail": 1 }));
        assert_eq!(response["poll_order"], serde_json::json!(["queue:mail"]));
    }
}
