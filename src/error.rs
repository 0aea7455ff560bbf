use std::io;
use std::path::PathBuf;

/// Failure to bring up the local sink. The process-wide [`crate::global::init`]
/// treats this as fatal.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open log file {}: {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Error returned when a remote client cannot be constructed.
///
/// Always recoverable: the logger keeps writing locally.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("invalid remote endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unsupported scheme `{0}` in remote endpoint, expected http or https")]
    UnsupportedScheme(String),

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("batch wait must be positive")]
    InvalidBatchWait,

    #[error("failed to build remote client: {0}")]
    Client(String),

    #[error("failed to start remote delivery worker: {0}")]
    Worker(#[from] io::Error),

    #[error("loki feature is not enabled")]
    BackendDisabled,
}

/// Error type of the process-wide control functions in [`crate::global`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("logger has not been initialized")]
    NotInitialized,

    #[error(transparent)]
    Init(#[from] InitError),

    #[error("remote reconfiguration failed: {0}")]
    Connection(#[from] ConnectionError),
}
