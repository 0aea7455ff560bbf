//! Process-wide logger that writes every record to the console and a
//! per-run log file, and optionally pushes it in batches to a
//! Loki-compatible aggregation backend without blocking the caller.

pub mod record;
pub mod error;
pub mod config;
pub mod env;
pub mod local;
pub mod sink;
pub mod backend;
pub mod remote;
pub mod logger;
pub mod global;
pub mod facade;
pub mod layer;
pub mod init;

#[cfg(feature = "loki")]
pub mod loki;

pub use config::{LoggerConfig, RemoteConfig};
pub use error::{ConnectionError, Error, InitError};
pub use global::{enable_remote, init, reconfigure_remote};
pub use logger::{Logger, RemoteStatus};
pub use record::{Caller, Fields, Level, LogRecord};
