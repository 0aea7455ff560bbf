//! Environment variable names used to configure the logger from the
//! outside, mostly for services started under a process supervisor.
//!
//! Only [`LoggerConfig::from_env`] reads them; the rest of the crate never
//! touches the environment.

use crate::config::LoggerConfig;
use std::time::Duration;

/// Directory the per-run log file is created in.
pub const LOG_FANOUT_DIR_ENV: &str = "LOG_FANOUT_DIR";

/// Minimum level, e.g. `info` or `warn`.
pub const LOG_FANOUT_LEVEL_ENV: &str = "LOG_FANOUT_LEVEL";

/// `false` or `0` turns off the console copy.
pub const LOG_FANOUT_STDOUT_ENV: &str = "LOG_FANOUT_STDOUT";

/// `true` or `1` enables the remote sink at startup.
pub const LOG_FANOUT_REMOTE_ENV: &str = "LOG_FANOUT_REMOTE";

/// Push endpoint of the aggregation backend.
pub const LOG_FANOUT_ENDPOINT_ENV: &str = "LOG_FANOUT_ENDPOINT";

/// Number of records per remote batch.
pub const LOG_FANOUT_BATCH_SIZE_ENV: &str = "LOG_FANOUT_BATCH_SIZE";

/// Seconds a partial remote batch may wait before it is flushed.
pub const LOG_FANOUT_BATCH_WAIT_SECS_ENV: &str = "LOG_FANOUT_BATCH_WAIT_SECS";

impl LoggerConfig {
    /// Build a config for `tag` from the process environment.
    pub fn from_env(tag: impl Into<String>) -> Self {
        Self::from_lookup(tag, |key| std::env::var(key).ok())
    }

    /// Build a config for `tag`, resolving overrides through `lookup`.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_lookup<F>(tag: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LoggerConfig::new(tag);

        if let Some(dir) = lookup(LOG_FANOUT_DIR_ENV) {
            config.log_dir = dir.into();
        }
        if let Some(level) = lookup(LOG_FANOUT_LEVEL_ENV).and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(stdout) = lookup(LOG_FANOUT_STDOUT_ENV).and_then(|v| parse_bool(&v)) {
            config.stdout = stdout;
        }
        if let Some(remote) = lookup(LOG_FANOUT_REMOTE_ENV).and_then(|v| parse_bool(&v)) {
            config.enable_remote = remote;
        }
        if let Some(endpoint) = lookup(LOG_FANOUT_ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            config.remote.endpoint = endpoint;
        }
        if let Some(size) = lookup(LOG_FANOUT_BATCH_SIZE_ENV).and_then(|v| v.trim().parse().ok()) {
            config.remote.batch_size = size;
        }
        if let Some(secs) = lookup(LOG_FANOUT_BATCH_WAIT_SECS_ENV).and_then(|v| v.trim().parse().ok()) {
            config.remote.batch_wait = Duration::from_secs(secs);
        }

        config
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
