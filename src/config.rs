use crate::record::Level;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Push endpoint used when remote logging is enabled without an explicit URL.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3100/loki/api/v1/push";
pub const DEFAULT_BATCH_SIZE: usize = 1024;
pub const DEFAULT_BATCH_WAIT: Duration = Duration::from_secs(3);
pub const DEFAULT_LOG_DIR: &str = "log";

/// Settings for one remote client instance.
///
/// **Fields**
/// - `endpoint`: push URL of the aggregation backend.
/// - `batch_size`: number of records that triggers an immediate flush.
/// - `batch_wait`: longest time a partial batch waits before it is sent.
/// - `channel_buffer`: capacity of the submission queue; records beyond it
///   are dropped instead of blocking the caller.
/// - `max_retries`: how many times a failed batch is re-sent before it is
///   discarded.
/// - `close_timeout`: upper bound on the final drain in
///   [`RemoteClient::close`](crate::remote::RemoteClient::close).
/// - `labels`: static stream labels attached to every pushed batch.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub batch_size: usize,
    pub batch_wait: Duration,
    pub channel_buffer: usize,
    pub max_retries: u32,
    pub close_timeout: Duration,
    pub labels: BTreeMap<String, String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_wait: DEFAULT_BATCH_WAIT,
            channel_buffer: 8192,
            max_retries: 3,
            close_timeout: Duration::from_secs(5),
            labels: BTreeMap::new(),
        }
    }
}

impl RemoteConfig {
    pub fn new(endpoint: impl Into<String>, batch_size: usize, batch_wait: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size,
            batch_wait,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Configuration of a [`Logger`](crate::logger::Logger).
///
/// `tag` becomes part of the log file name and the `source` label of
/// remote streams. `remote` is only used when `enable_remote` is set.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub tag: String,
    pub log_dir: PathBuf,
    pub level: Level,
    pub stdout: bool,
    pub enable_remote: bool,
    pub remote: RemoteConfig,
}

impl LoggerConfig {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            level: Level::Trace,
            stdout: true,
            enable_remote: false,
            remote: RemoteConfig::default(),
        }
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn stdout(mut self, enabled: bool) -> Self {
        self.stdout = enabled;
        self
    }

    /// Enable the remote sink at startup. An empty endpoint keeps the
    /// currently configured one.
    pub fn remote(mut self, enabled: bool, endpoint: &str) -> Self {
        self.enable_remote = enabled;
        if !endpoint.is_empty() {
            self.remote.endpoint = endpoint.to_string();
        }
        self
    }

    pub fn remote_config(mut self, remote: RemoteConfig) -> Self {
        self.remote = remote;
        self
    }
}
