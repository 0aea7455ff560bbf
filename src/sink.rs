use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous transport for [`LogRecord`]s on their way to a remote
/// aggregation backend.
///
/// Implementations own the wire protocol (Loki push, a proprietary
/// collector, a test recorder). The [`RemoteClient`](crate::remote::RemoteClient)
/// calls them only from its own worker thread, never from the thread that
/// emitted the record.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single log record to the underlying backend.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted by the backend.
    /// - `Err(..)` if the backend failed (network error, serialization
    ///   error, HTTP status, etc). The client treats this as transient and
    ///   retries the whole batch with backoff.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Send a full batch in one go.
    ///
    /// The default implementation sends records one by one and stops at the
    /// first failure. Backends with a native bulk API should override it.
    async fn send_batch(&self, records: &[LogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        for record in records {
            self.send(record).await?;
        }
        Ok(())
    }

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Called exactly once when the owning client is closed. Default
    /// implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of the client itself without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
