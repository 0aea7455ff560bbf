//! Process-wide logger instance.
//!
//! [`init`] builds a [`Logger`] and installs it as the instance every free
//! function in [`crate::facade`] and every [`FanoutLayer`](crate::layer::FanoutLayer)
//! routes to. Calling it again replaces the instance; the previous remote
//! client is closed before the new logger is opened.

use crate::config::{LoggerConfig, RemoteConfig};
use crate::error::{Error, InitError};
use crate::logger::Logger;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

static LOGGER: RwLock<Option<Arc<Logger>>> = RwLock::new(None);
// Serializes init/install against each other without blocking readers of LOGGER.
static INIT: Mutex<()> = Mutex::new(());

/// Initialize the process-wide logger writing to `log/<timestamp>_<tag>.log`.
///
/// When `enable_remote` is set, records are also pushed to `remote_endpoint`
/// (or [`DEFAULT_ENDPOINT`](crate::config::DEFAULT_ENDPOINT) if it is
/// empty). A remote that cannot be reached only produces a warning.
///
/// # Panics
///
/// Panics if the log file cannot be created: the rest of the process must
/// not run with half of its logging missing.
pub fn init(tag: &str, enable_remote: bool, remote_endpoint: &str) -> Arc<Logger> {
    let config = LoggerConfig::new(tag).remote(enable_remote, remote_endpoint);
    init_with_config(config)
}

/// Like [`init`], with full control over the configuration.
///
/// # Panics
///
/// Panics if the log file cannot be created.
pub fn init_with_config(config: LoggerConfig) -> Arc<Logger> {
    match try_init(config) {
        Ok(logger) => logger,
        Err(e) => panic!("logger initialization failed: {e}"),
    }
}

/// Fallible variant of [`init_with_config`].
///
/// The previous instance's remote client is closed even when opening the
/// new local sink fails.
pub fn try_init(config: LoggerConfig) -> Result<Arc<Logger>, InitError> {
    let _guard = INIT.lock();
    if let Some(previous) = current() {
        previous.close_remote();
    }
    let logger = Arc::new(Logger::open(config)?);
    *LOGGER.write() = Some(Arc::clone(&logger));
    Ok(logger)
}

/// Install an already built logger, closing the remote client of the one
/// it replaces. Returns the replaced instance.
pub fn install(logger: Arc<Logger>) -> Option<Arc<Logger>> {
    let _guard = INIT.lock();
    let previous = LOGGER.write().replace(logger);
    if let Some(previous) = &previous {
        previous.close_remote();
    }
    previous
}

/// The current process-wide logger, if one was initialized.
pub fn current() -> Option<Arc<Logger>> {
    LOGGER.read().clone()
}

/// Turn forwarding to the remote sink on or off.
pub fn enable_remote(enabled: bool) -> Result<(), Error> {
    let logger = current().ok_or(Error::NotInitialized)?;
    logger.enable_remote(enabled);
    Ok(())
}

/// Replace the remote client with one pushing to `endpoint` in batches of
/// `batch_size` records or every `batch_wait_secs` seconds.
pub fn reconfigure_remote(endpoint: &str, batch_size: usize, batch_wait_secs: u64) -> Result<(), Error> {
    let logger = current().ok_or(Error::NotInitialized)?;
    let config = RemoteConfig::new(endpoint, batch_size, Duration::from_secs(batch_wait_secs));
    logger.reconfigure_remote(config)?;
    Ok(())
}

/// Drain and close the remote client and flush the local writers. The
/// logger stays installed and keeps writing locally.
pub fn shutdown() {
    if let Some(logger) = current() {
        logger.shutdown();
    }
}
