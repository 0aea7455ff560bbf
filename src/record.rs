use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;

pub use serde_json::Value;

/// Structured key/value pairs attached to a single record.
pub type Fields = BTreeMap<String, Value>;

/// Build a [`Fields`] map from `key => value` pairs.
///
/// Values go through [`Value::from`], so strings, integers,
/// floats and booleans all work directly.
///
/// ```
/// let fields = log_fanout::fields! { "url" => "http://x", "status" => 404 };
/// assert_eq!(fields["status"], 404);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::record::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::record::Fields::new();
        $(
            map.insert(::std::string::String::from($key), $crate::record::Value::from($value));
        )+
        map
    }};
}

/// Severity of a record, ordered from most to least verbose.
///
/// `Fatal` and `Panic` are severities only: emitting them never exits the
/// process or unwinds the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Fatal,
        Level::Panic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
            Level::Panic => "panic",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        Level::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(Level::Panic)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            "panic" => Ok(Level::Panic),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Source location a record was emitted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl From<&Location<'_>> for Caller {
    fn from(location: &Location<'_>) -> Self {
        Caller::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A single log record as it travels to the local and remote sinks.
///
/// Records are built once per emission and never mutated afterwards; the
/// remote side gets its own clone.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub fields: Fields,
    pub caller: Option<Caller>,
}

impl LogRecord {
    /// Create a record stamped with the current time and no fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: Fields::new(),
            caller: None,
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
