// SQLite Job Store - queue catalog, producer side and poller

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use dynaq_core::domain::queue::validate_queue_name;
use dynaq_core::domain::{FetchedJob, JobPayload, PollOrder, QueueName};
use dynaq_core::error::Result;
use dynaq_core::port::{
    IdProvider, JobProducer, QueueCatalog, QueuePoller, QueueSize, TimeProvider,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Interval between polling rounds while waiting for the poll timeout
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(sqlx::FromRow)]
struct QueueSizeRow {
    name: String,
    pending: i64,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    queue: String,
    payload: String,
    enqueued_at: i64,
}

impl JobRow {
    fn into_job(self) -> Result<FetchedJob> {
        let payload: Value = serde_json::from_str(&self.payload)?;
        Ok(FetchedJob {
            id: self.id,
            queue: self.queue,
            payload: JobPayload::new(payload),
            enqueued_at: self.enqueued_at,
        })
    }
}

pub struct SqliteJobStore {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    poll_interval: Duration,
}

impl SqliteJobStore {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Pop the oldest job of one queue, if any
    async fn pop(&self, queue: &str) -> Result<Option<FetchedJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            DELETE FROM jobs
            WHERE seq = (SELECT seq FROM jobs WHERE queue = ? ORDER BY seq LIMIT 1)
            RETURNING id, queue, payload, enqueued_at
            "#,
        )
        .bind(queue)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_job).transpose()
    }
}

#[async_trait]
impl JobProducer for SqliteJobStore {
    async fn push(&self, queue: &str, payload: JobPayload) -> Result<FetchedJob> {
        validate_queue_name(queue)?;

        let job = FetchedJob {
            id: self.id_provider.generate_id(),
            queue: queue.to_string(),
            payload,
            enqueued_at: self.time_provider.now_millis(),
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT OR IGNORE INTO queues (name, created_at) VALUES (?, ?)")
            .bind(&job.queue)
            .bind(job.enqueued_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO jobs (id, queue, payload, enqueued_at) VALUES (?, ?, ?, ?)")
            .bind(&job.id)
            .bind(&job.queue)
            .bind(job.payload.as_value().to_string())
            .bind(job.enqueued_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(job_id = %job.id, queue = %job.queue, "Job pushed");
        Ok(job)
    }

    async fn queue_sizes(&self) -> Result<Vec<QueueSize>> {
        let rows = sqlx::query_as::<_, QueueSizeRow>(
            r#"
            SELECT q.name AS name, COUNT(j.id) AS pending
            FROM queues q
            LEFT JOIN jobs j ON j.queue = q.name
            GROUP BY q.name
            ORDER BY q.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| QueueSize {
                name: row.name,
                pending: row.pending,
            })
            .collect())
    }
}

#[async_trait]
impl QueueCatalog for SqliteJobStore {
    async fn list_queues(&self) -> Result<Vec<QueueName>> {
        sqlx::query_scalar("SELECT name FROM queues ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl QueuePoller for SqliteJobStore {
    /// SQLite cannot block, so the queues are re-polled in order every
    /// `poll_interval` until the order's timeout elapses.
    async fn fetch(&self, order: &PollOrder) -> Result<Option<FetchedJob>> {
        let deadline = Instant::now() + order.timeout();
        loop {
            for queue in order.queue_names() {
                if let Some(job) = self.pop(queue).await? {
                    return Ok(Some(job));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use dynaq_core::port::providers::mocks::{SequentialIdProvider, SteppingTimeProvider};

    async fn setup_store() -> SqliteJobStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobStore::new(
            pool,
            Arc::new(SequentialIdProvider::default()),
            Arc::new(SteppingTimeProvider::new(1_000)),
        )
        .with_poll_interval(Duration::from_millis(5))
    }

    fn payload(n: i64) -> JobPayload {
        JobPayload::new(serde_json::json!({ "n": n }))
    }

    #[tokio::test]
    async fn test_push_registers_queue() {
        let store = setup_store().await;
        store.push("mail", payload(1)).await.unwrap();
        store.push("alerts", payload(2)).await.unwrap();
        store.push("mail", payload(3)).await.unwrap();

        assert_eq!(store.list_queues().await.unwrap(), vec!["alerts", "mail"]);
        assert_eq!(
            store.queue_sizes().await.unwrap(),
            vec![
                QueueSize {
                    name: "alerts".to_string(),
                    pending: 1
                },
                QueueSize {
                    name: "mail".to_string(),
                    pending: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_push_rejects_pattern_names() {
        let store = setup_store().await;
        tokio_test::assert_err!(store.push("mail*", payload(1)).await);
        assert!(store.list_queues().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_follows_poll_order_and_fifo() {
        let store = setup_store().await;
        store.push("low", payload(1)).await.unwrap();
        store.push("high", payload(2)).await.unwrap();
        store.push("high", payload(3)).await.unwrap();

        let order = PollOrder::from_names(["high", "low"], Duration::from_secs(0));
        let first = store.fetch(&order).await.unwrap().unwrap();
        let second = store.fetch(&order).await.unwrap().unwrap();
        let third = store.fetch(&order).await.unwrap().unwrap();

        assert_eq!(first.payload, payload(2));
        assert_eq!(second.payload, payload(3));
        assert_eq!(third.queue, "low");
        assert!(store.fetch(&order).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_queues_outside_order() {
        let store = setup_store().await;
        store.push("other", payload(1)).await.unwrap();

        let order = PollOrder::from_names(["mail"], Duration::from_secs(0));
        assert!(store.fetch(&order).await.unwrap().is_none());
        assert_eq!(store.queue_sizes().await.unwrap()[0].pending, 1);
    }

    #[tokio::test]
    async fn test_fetch_waits_for_timeout_when_empty() {
        let store = setup_store().await;
        let order = PollOrder::from_names(["mail"], Duration::from_secs(1));

        let started = Instant::now();
        assert!(store.fetch(&order).await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
