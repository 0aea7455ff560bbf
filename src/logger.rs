use crate::backend::{self, Connector};
use crate::config::{LoggerConfig, RemoteConfig};
use crate::error::{ConnectionError, InitError};
use crate::local::LocalSink;
use crate::record::{Fields, Level, LogRecord};
use crate::remote::{RemoteClient, StatsSnapshot};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Where the remote side currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Disabled,
    /// Enabled, but the last construction failed or none was attempted.
    EnabledNoClient,
    EnabledWithClient,
}

/// Immutable view of the remote side. Emission reads the current snapshot
/// without taking the control lock; mutations publish a new one.
#[derive(Clone, Default)]
struct RemoteState {
    enabled: bool,
    client: Option<Arc<RemoteClient>>,
}

/// Logger instance fanning every record out to a [`LocalSink`] and, when
/// enabled, a [`RemoteClient`].
///
/// Emission methods take `&self` and are safe to call from any thread.
/// The remote configuration is changed through [`enable_remote`],
/// [`reconfigure_remote`] and [`close_remote`]; these serialize on an
/// internal control lock, and at most one remote client is open at any
/// time: the previous one is closed before a replacement is built.
///
/// A record emitted while a reconfiguration is in flight may miss the
/// remote side, or be handed to a client that is being closed and dropped
/// there. The local copy is always written.
///
/// [`enable_remote`]: Logger::enable_remote
/// [`reconfigure_remote`]: Logger::reconfigure_remote
/// [`close_remote`]: Logger::close_remote
pub struct Logger {
    tag: String,
    level: AtomicU8,
    local: LocalSink,
    remote: RwLock<Arc<RemoteState>>,
    control: Mutex<()>,
    connector: Connector,
}

impl Logger {
    /// Open the local sink described by `config` and, if requested, connect
    /// the remote sink through the default Loki transport.
    ///
    /// A failing local sink is returned as an error; a failing remote sink
    /// is reported as a warning on the local sink and leaves the logger in
    /// [`RemoteStatus::EnabledNoClient`].
    pub fn open(config: LoggerConfig) -> Result<Self, InitError> {
        Self::open_with_connector(config, backend::default_connector())
    }

    pub fn open_with_connector(config: LoggerConfig, connector: Connector) -> Result<Self, InitError> {
        let local = LocalSink::open(&config.log_dir, &config.tag, config.stdout)?;
        let logger = Self::with_local_sink(&config.tag, config.level, local, connector);

        if config.enable_remote {
            let remote = logger.labeled(config.remote);
            let client = match RemoteClient::connect(&remote, &logger.connector) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    eprintln!("failed to connect remote log sink {}: {}", remote.endpoint, e);
                    logger.write_local(
                        &LogRecord::new(Level::Warn, "remote log sink unavailable, logging locally only")
                            .with_fields(crate::fields! {
                                "endpoint" => remote.endpoint.as_str(),
                                "error" => e.to_string(),
                            }),
                    );
                    None
                }
            };
            logger.publish(RemoteState {
                enabled: true,
                client,
            });
        }

        Ok(logger)
    }

    /// Logger over an existing local sink with the remote side disabled.
    pub fn with_local_sink(tag: &str, level: Level, local: LocalSink, connector: Connector) -> Self {
        Self {
            tag: tag.to_string(),
            level: AtomicU8::new(level as u8),
            local,
            remote: RwLock::new(Arc::new(RemoteState::default())),
            control: Mutex::new(()),
            connector,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Path of the log file written by this instance.
    pub fn log_path(&self) -> Option<&Path> {
        self.local.path()
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Drop records below `level` from both sinks.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord::new(level, message.to_string()).with_caller(Location::caller().into());
        self.dispatch(record);
    }

    #[track_caller]
    pub fn log_with_fields(&self, level: Level, fields: Fields, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let record = LogRecord::new(level, message.to_string())
            .with_fields(fields)
            .with_caller(Location::caller().into());
        self.dispatch(record);
    }

    /// Route a fully built record, e.g. one converted from a `tracing` event.
    pub fn log_record(&self, record: LogRecord) {
        if self.enabled(record.level) {
            self.dispatch(record);
        }
    }

    fn dispatch(&self, record: LogRecord) {
        let state = self.snapshot();
        if state.enabled {
            if let Some(client) = &state.client {
                client.submit(record.clone());
            }
        }
        self.write_local(&record);
    }

    fn write_local(&self, record: &LogRecord) {
        // Local write failures are not retried.
        let _ = self.local.write(record);
    }

    fn snapshot(&self) -> Arc<RemoteState> {
        Arc::clone(&*self.remote.read())
    }

    fn publish(&self, state: RemoteState) {
        *self.remote.write() = Arc::new(state);
    }

    fn labeled(&self, mut config: RemoteConfig) -> RemoteConfig {
        config
            .labels
            .entry("source".to_string())
            .or_insert_with(|| self.tag.clone());
        config
    }

    pub fn remote_status(&self) -> RemoteStatus {
        let state = self.snapshot();
        match (state.enabled, &state.client) {
            (false, _) => RemoteStatus::Disabled,
            (true, None) => RemoteStatus::EnabledNoClient,
            (true, Some(_)) => RemoteStatus::EnabledWithClient,
        }
    }

    /// Push endpoint of the installed remote client, if any.
    pub fn remote_endpoint(&self) -> Option<String> {
        self.snapshot().client.as_ref().map(|client| client.endpoint().to_string())
    }

    /// Delivery counters of the installed remote client, if any.
    pub fn remote_stats(&self) -> Option<StatsSnapshot> {
        self.snapshot().client.as_ref().map(|client| client.stats())
    }

    /// Toggle forwarding to the remote side. Does not construct or close a
    /// client; pair with [`reconfigure_remote`](Self::reconfigure_remote).
    pub fn enable_remote(&self, enabled: bool) {
        let _guard = self.control.lock();
        let current = self.snapshot();
        self.publish(RemoteState {
            enabled,
            client: current.client.clone(),
        });
    }

    /// Replace the remote client.
    ///
    /// The installed client, if any, is detached and fully closed before the
    /// new one is constructed. On success the new client is installed and
    /// forwarding is enabled; on failure no client is left installed and the
    /// error is returned. Local logging is unaffected either way.
    pub fn reconfigure_remote(&self, config: RemoteConfig) -> Result<(), ConnectionError> {
        let _guard = self.control.lock();
        self.detach_and_close();

        let config = self.labeled(config);
        match RemoteClient::connect(&config, &self.connector) {
            Ok(client) => {
                self.publish(RemoteState {
                    enabled: true,
                    client: Some(Arc::new(client)),
                });
                Ok(())
            }
            Err(e) => {
                self.publish(RemoteState {
                    enabled: true,
                    client: None,
                });
                Err(e)
            }
        }
    }

    /// Detach and close the remote client, keeping the enabled flag.
    pub fn close_remote(&self) {
        let _guard = self.control.lock();
        self.detach_and_close();
    }

    // Caller holds the control lock.
    fn detach_and_close(&self) {
        let current = self.snapshot();
        if let Some(old) = current.client.clone() {
            self.publish(RemoteState {
                enabled: current.enabled,
                client: None,
            });
            old.close();
        }
    }

    /// Close the remote side and flush the local writers.
    pub fn shutdown(&self) {
        self.close_remote();
        let _ = self.local.flush();
    }
}

macro_rules! level_methods {
    ($($level:ident => $plain:ident, $with_fields:ident;)+) => {
        impl Logger {
            $(
                #[track_caller]
                pub fn $plain(&self, message: impl fmt::Display) {
                    self.log(Level::$level, message)
                }

                #[track_caller]
                pub fn $with_fields(&self, fields: Fields, message: impl fmt::Display) {
                    self.log_with_fields(Level::$level, fields, message)
                }
            )+
        }
    };
}

level_methods! {
    Trace => trace, with_fields_trace;
    Debug => debug, with_fields_debug;
    Info => info, with_fields_info;
    Warn => warn, with_fields_warn;
    Error => error, with_fields_error;
    Fatal => fatal, with_fields_fatal;
    Panic => panic, with_fields_panic;
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("tag", &self.tag)
            .field("level", &self.level())
            .field("log_path", &self.log_path())
            .field("remote", &self.remote_status())
            .finish()
    }
}
