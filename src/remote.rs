use crate::backend::{self, Connector};
use crate::config::RemoteConfig;
use crate::error::ConnectionError;
use crate::record::LogRecord;
use crate::sink::LogSink;
use parking_lot::Mutex;
use std::cell::Cell;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, timeout, Duration, MissedTickBehavior};

const MIN_CHANNEL_BUFFER: usize = 16;
const MIN_BATCH_WAIT: Duration = Duration::from_millis(10);
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

thread_local! {
    static DELIVERY_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Whether the calling thread belongs to a remote client's worker runtime.
///
/// `tracing` events raised there come from the transport itself (connection
/// pool, HTTP framing) and must not be fed back into the logger.
pub fn is_delivery_thread() -> bool {
    DELIVERY_THREAD.with(Cell::get)
}

fn mark_delivery_thread() {
    DELIVERY_THREAD.with(|flag| flag.set(true));
}

/// Delivery counters of one [`RemoteClient`].
#[derive(Debug, Default)]
pub struct RemoteStats {
    /// Records accepted by [`RemoteClient::submit`].
    pub submitted: AtomicU64,
    /// Rejected because the queue was full or the client was closed.
    pub dropped: AtomicU64,
    /// Acknowledged by the backend.
    pub delivered: AtomicU64,
    /// Discarded after exhausting retries or the close deadline.
    pub failed: AtomicU64,
}

/// Plain copy of [`RemoteStats`] at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl RemoteStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fire-and-forget client for a remote aggregation backend.
///
/// Records handed to [`submit`](Self::submit) go into a bounded channel and
/// return immediately. A dedicated worker thread running its own Tokio
/// runtime pulls them out, groups them into batches and hands each batch to
/// the [`LogSink`] once it reaches `batch_size` records or `batch_wait`
/// elapses, whichever comes first. The caller never needs to be inside a
/// runtime and never waits on network I/O.
pub struct RemoteClient {
    sender: mpsc::Sender<LogRecord>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    stats: Arc<RemoteStats>,
    // Set while the queue is overflowing; cleared by the next accepted record.
    saturated: AtomicBool,
    endpoint: String,
}

impl RemoteClient {
    /// Connect to `config.endpoint` through the default Loki transport.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConnectionError> {
        Self::connect(config, &backend::default_connector())
    }

    /// Build the transport with `connector` and start the client on it.
    pub fn connect(config: &RemoteConfig, connector: &Connector) -> Result<Self, ConnectionError> {
        backend::validate(config)?;
        let sink = connector(config)?;
        Self::with_sink(sink, config)
    }

    /// Start a client delivering to an already constructed sink.
    pub fn with_sink(sink: Arc<dyn LogSink>, config: &RemoteConfig) -> Result<Self, ConnectionError> {
        backend::validate(config)?;

        // Enforce minimal thresholds to avoid degenerate configs.
        let buffer = config.channel_buffer.max(MIN_CHANNEL_BUFFER);
        let settings = WorkerSettings {
            batch_size: config.batch_size.max(1),
            batch_wait: config.batch_wait.max(MIN_BATCH_WAIT),
            max_retries: config.max_retries,
            close_timeout: config.close_timeout,
        };

        let (tx, rx) = mpsc::channel::<LogRecord>(buffer);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stats = Arc::new(RemoteStats::default());

        // Blocking-pool threads (e.g. DNS lookups) are marked too.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .on_thread_start(mark_delivery_thread)
            .build()?;
        let stats_bg = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name("log-fanout-remote".to_string())
            .spawn(move || {
                mark_delivery_thread();
                runtime.block_on(run_worker(sink, rx, shutdown_rx, settings, stats_bg));
            })?;

        Ok(Self {
            sender: tx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
            stats,
            saturated: AtomicBool::new(false),
            endpoint: config.endpoint.clone(),
        })
    }

    /// Queue a record for delivery. Never blocks and never fails loudly:
    /// if the queue is full or the client is already closed the record is
    /// dropped and counted. A full queue is reported on stderr once per
    /// overflow episode.
    pub fn submit(&self, record: LogRecord) {
        match self.sender.try_send(record) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                if self.saturated.load(Ordering::Relaxed) {
                    self.saturated.store(false, Ordering::Relaxed);
                }
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                if !self.saturated.swap(true, Ordering::Relaxed) {
                    eprintln!("remote log queue for {} full, dropping log records", self.endpoint);
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drain queued records with a final best-effort flush, then stop the
    /// worker. Blocks until the worker is gone, for about `close_timeout` at
    /// most: a batch still being retried is abandoned and re-sent as part of
    /// the drain. Calling it again is a no-op.
    pub fn close(&self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                eprintln!("remote log worker for {} panicked", self.endpoint);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.worker.lock().is_none()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

#[derive(Clone, Copy)]
struct WorkerSettings {
    batch_size: usize,
    batch_wait: Duration,
    max_retries: u32,
    close_timeout: Duration,
}

async fn run_worker(
    sink: Arc<dyn LogSink>,
    mut rx: mpsc::Receiver<LogRecord>,
    mut shutdown: oneshot::Receiver<()>,
    settings: WorkerSettings,
    stats: Arc<RemoteStats>,
) {
    let mut batch = Vec::with_capacity(settings.batch_size);
    let mut ticker = interval(settings.batch_wait);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        let flush = tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(record) => {
                    batch.push(record);
                    batch.len() >= settings.batch_size
                }
                // Every sender is gone: the client was dropped without close().
                None => break,
            },
            _ = ticker.tick() => !batch.is_empty(),
            _ = &mut shutdown => break,
        };
        if !flush {
            continue;
        }

        // Shutdown preempts a send that is still retrying; the batch is kept
        // and goes out with the drain below.
        tokio::select! {
            result = send_batch(&*sink, &mut batch, settings.max_retries, &stats) => {
                if let Err(e) = result {
                    eprintln!("error sending log batch: {}", e);
                }
            }
            _ = &mut shutdown => break,
        }
        ticker.reset();
    }

    rx.close();
    let drain = async {
        while let Some(record) = rx.recv().await {
            batch.push(record);
            if batch.len() >= settings.batch_size {
                if let Err(e) = send_batch(&*sink, &mut batch, settings.max_retries, &stats).await {
                    eprintln!("error sending log batch during close: {}", e);
                }
            }
        }
        if !batch.is_empty() {
            if let Err(e) = send_batch(&*sink, &mut batch, settings.max_retries, &stats).await {
                eprintln!("error flushing log batch during close: {}", e);
            }
        }
        if let Err(e) = sink.flush().await {
            eprintln!("error flushing log sink during close: {}", e);
        }
    };

    if timeout(settings.close_timeout, drain).await.is_err() {
        let mut lost = batch.len() as u64;
        while rx.try_recv().is_ok() {
            lost += 1;
        }
        stats.failed.fetch_add(lost, Ordering::Relaxed);
        eprintln!("remote log close timed out, {} records not delivered", lost);
    }
}

/// Deliver `batch`, retrying with exponential backoff. The batch is empty
/// afterwards whether it was delivered or given up on.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<LogRecord>,
    max_retries: u32,
    stats: &RemoteStats,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        match sink.send_batch(batch).await {
            Ok(()) => {
                stats.delivered.fetch_add(batch.len() as u64, Ordering::Relaxed);
                batch.clear();
                return Ok(());
            }
            Err(e) if attempt >= max_retries => {
                stats.failed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                batch.clear();
                return Err(e);
            }
            Err(_) => {
                eprintln!("log sink send failed, retrying in {:?}", backoff);
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
                attempt += 1;
            }
        }
    }
}
