//! Checkout audit trail: direct multi-row inserts plus a batching buffer.

use crate::error::{Error, Result};
use crate::model::CheckoutAttempt;
use crate::providers::AuditSink;
use sqlx::{PgPool, QueryBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Upper bound on one batched insert.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Unbuffered audit log: every `add` is one multi-row INSERT.
#[derive(Clone)]
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AuditSink for PostgresAuditLog {
    async fn add(&self, attempts: Vec<CheckoutAttempt>) -> Result<()> {
        if attempts.is_empty() {
            return Ok(());
        }

        let mut query =
            QueryBuilder::new("INSERT INTO checkouts (user_id, item_id, created_at, code, error) ");
        query.push_values(&attempts, |mut row, attempt| {
            row.push_bind(attempt.user_id)
                .push_bind(attempt.item_id)
                .push_bind(attempt.created_at)
                .push_bind(attempt.code.as_deref())
                .push_bind(attempt.error.as_deref());
        });

        let result = query.build().execute(&self.pool).await?;

        if result.rows_affected() != attempts.len() as u64 {
            return Err(Error::Internal(format!(
                "expected {} checkout rows inserted, got {}",
                attempts.len(),
                result.rows_affected()
            )));
        }

        Ok(())
    }
}

/// Buffering wrapper around any [`AuditSink`].
///
/// `add` appends under a short mutex and returns; the actual insert happens
/// asynchronously when the buffer reaches `batch_size` or the flush interval
/// elapses. Failed flushes are logged and dropped, never retried: audit is
/// best-effort, and on sustained database unavailability the sink sheds
/// records rather than backpressuring the hot path.
pub struct BatchingAuditLog<S> {
    inner: S,
    buffer: Arc<Mutex<Vec<CheckoutAttempt>>>,
    batch_size: usize,
}

impl<S> Clone for BatchingAuditLog<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            buffer: Arc::clone(&self.buffer),
            batch_size: self.batch_size,
        }
    }
}

impl<S> BatchingAuditLog<S>
where
    S: AuditSink + Clone + Send + Sync + 'static,
{
    /// Create the sink and start its flusher task.
    ///
    /// The flusher flushes every `flush_interval` and performs one final
    /// drain flush when the shutdown signal fires.
    pub fn new(
        inner: S,
        batch_size: usize,
        flush_interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let sink = Self {
            inner,
            buffer: Arc::new(Mutex::new(Vec::with_capacity(batch_size))),
            batch_size,
        };

        let worker = sink.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => worker.flush().await,
                    _ = shutdown.recv() => {
                        worker.flush().await;
                        break;
                    }
                }
            }
        });

        sink
    }

    /// Flush buffered attempts now.
    ///
    /// Swaps the buffer out under the mutex, then runs the batched insert
    /// with a 10-second bound. Failures are logged; the batch is dropped.
    pub async fn flush(&self) {
        let batch = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };

        let count = batch.len();
        match tokio::time::timeout(FLUSH_TIMEOUT, self.inner.add(batch)).await {
            Ok(Ok(())) => tracing::debug!(count, "flushed checkout attempts"),
            Ok(Err(e)) => tracing::error!(error = %e, count, "can't flush checkout attempts"),
            Err(_) => tracing::error!(count, "checkout attempt flush timed out"),
        }
    }
}

impl<S> AuditSink for BatchingAuditLog<S>
where
    S: AuditSink + Clone + Send + Sync + 'static,
{
    async fn add(&self, attempts: Vec<CheckoutAttempt>) -> Result<()> {
        if attempts.is_empty() {
            return Ok(());
        }

        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.extend(attempts);
            buffer.len() >= self.batch_size
        };

        if should_flush {
            let sink = self.clone();
            tokio::spawn(async move { sink.flush().await });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockAuditSink;

    fn attempt(user_id: i64) -> CheckoutAttempt {
        CheckoutAttempt::succeeded(user_id, 1, format!("{user_id}:1:a1B2c3D4"))
    }

    #[tokio::test]
    async fn add_buffers_below_batch_size() {
        let (_tx, rx) = broadcast::channel(1);
        let inner = MockAuditSink::new();
        let sink = BatchingAuditLog::new(inner.clone(), 10, Duration::from_secs(3600), rx);

        sink.add(vec![attempt(1), attempt(2)]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(inner.recorded().is_empty());
    }

    #[tokio::test]
    async fn reaching_batch_size_triggers_flush() {
        let (_tx, rx) = broadcast::channel(1);
        let inner = MockAuditSink::new();
        let sink = BatchingAuditLog::new(inner.clone(), 3, Duration::from_secs(3600), rx);

        sink.add(vec![attempt(1), attempt(2), attempt(3)])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(inner.recorded().len(), 3);
    }

    #[tokio::test]
    async fn interval_flushes_partial_buffer() {
        let (_tx, rx) = broadcast::channel(1);
        let inner = MockAuditSink::new();
        let sink = BatchingAuditLog::new(inner.clone(), 100, Duration::from_millis(50), rx);

        sink.add(vec![attempt(1)]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(inner.recorded().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_drains_buffer() {
        let (tx, rx) = broadcast::channel(1);
        let inner = MockAuditSink::new();
        let sink = BatchingAuditLog::new(inner.clone(), 100, Duration::from_secs(3600), rx);

        sink.add(vec![attempt(1), attempt(2)]).await.unwrap();
        tx.send(()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(inner.recorded().len(), 2);
    }

    #[tokio::test]
    async fn failed_flush_drops_batch() {
        let (_tx, rx) = broadcast::channel(1);
        let inner = MockAuditSink::new();
        inner.fail_with("audit backend down");
        let sink = BatchingAuditLog::new(inner.clone(), 1, Duration::from_secs(3600), rx);

        sink.add(vec![attempt(1)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Not retried: the buffer stays empty after the failed attempt.
        inner.succeed();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(inner.recorded().is_empty());
    }
}
