//! Dynaq worker - entry point
//!
//! Wires SQLite storage, the host identity, the weighted selector, fetch
//! loops and the JSON-RPC admin API together.

mod config;
mod dispatcher;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{DaemonConfig, LogFormat};
use dispatcher::LoggingDispatcher;
use dynaq_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use dynaq_core::application::{
    shutdown_channel, DynamicFetcher, DynamicQueueRegistry, SelectorConfig, WeightedQueueSelector,
};
use dynaq_core::port::{HostIdentity, SystemTimeProvider, TimeProvider, UuidProvider};
use dynaq_infra_sqlite::{create_pool, run_migrations, SqliteDynamicQueueStore, SqliteJobStore};
use dynaq_infra_system::SystemHostIdentity;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env()?;

    // 1. Logging (stdout through a non-blocking writer, optional OTLP layer)
    let (otel_layer, otel_status) = telemetry::init_telemetry();
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("dynaq=info"))?;

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(otel_layer)
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(otel_layer)
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
    }

    info!(version = VERSION, "Dynaq worker starting");

    otel_status.log();

    // 2. Database
    config.ensure_db_dir()?;
    info!(db_path = %config.db_path, "Initializing database");
    let pool = create_pool(&config.db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 3. Wiring
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let job_store = Arc::new(SqliteJobStore::new(
        pool.clone(),
        Arc::new(UuidProvider),
        time_provider.clone(),
    ));
    let registry = Arc::new(DynamicQueueRegistry::new(Arc::new(
        SqliteDynamicQueueStore::new(pool.clone()),
    )));
    let host: Arc<dyn HostIdentity> =
        Arc::new(SystemHostIdentity::with_override(config.hostname.clone()));
    let selector = Arc::new(WeightedQueueSelector::new(
        registry.clone(),
        host.clone(),
        SelectorConfig {
            poll_timeout: config.poll_timeout,
            ..SelectorConfig::default()
        },
    ));
    let dispatcher = Arc::new(LoggingDispatcher::new(time_provider.clone()));

    info!(
        hostname = %host.hostname(),
        queues = ?config.queues,
        strict = config.strict,
        concurrency = config.concurrency,
        "Queue selection configured"
    );

    // 4. JSON-RPC server
    let handler = RpcHandler::new(
        registry.clone(),
        selector.clone(),
        job_store.clone(),
        job_store.clone(),
        host.clone(),
    );
    let rpc_config = RpcServerConfig {
        port: config.rpc_port,
        ..Default::default()
    };
    let rpc_handle = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 5. Fetch loops
    let (shutdown_tx, _) = shutdown_channel();
    let mut fetchers = Vec::with_capacity(config.concurrency);
    for slot in 0..config.concurrency {
        let fetcher = DynamicFetcher::new(
            config.queues.clone(),
            config.strict,
            job_store.clone(),
            selector.clone(),
            job_store.clone(),
            dispatcher.clone(),
        );
        let token = shutdown_tx.subscribe();
        fetchers.push(tokio::spawn(async move {
            if let Err(e) = fetcher.run(token).await {
                error!(slot = slot, error = %e, "Fetcher failed");
            }
        }));
    }

    info!("Worker ready, press Ctrl+C to shut down");

    // 6. Shutdown
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(fetchers))
        .await
        .is_err()
    {
        tracing::warn!("Fetchers did not stop within the grace period");
    }

    info!(dispatched = dispatcher.dispatched(), "Shutdown complete");
    Ok(())
}
