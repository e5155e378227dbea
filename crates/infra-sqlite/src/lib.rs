// Dynaq Infrastructure - SQLite Adapter
// Implements: DynamicQueueStore, JobProducer, QueueCatalog, QueuePoller

mod connection;
mod dynamic_queue_store;
mod error;
mod job_store;
mod migration;

pub use connection::create_pool;
pub use dynamic_queue_store::SqliteDynamicQueueStore;
pub use job_store::SqliteJobStore;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
