//! Free functions emitting through the process-wide logger.
//!
//! Each level has a plain form taking anything that implements
//! `Display` (a `&str`, a `String`, or `format_args!(..)`) and a
//! `with_fields_*` form that also attaches a [`Fields`] map:
//!
//! ```no_run
//! use log_fanout::{facade, fields};
//!
//! facade::info("server started");
//! facade::warn(format_args!("retry {} of {}", 2, 5));
//! facade::with_fields_warn(fields! { "url" => "http://google.com" }, "ping to google");
//! ```
//!
//! Before [`init`](crate::global::init) has run, records are rendered to
//! stderr only.

use crate::global;
use crate::local::LocalSink;
use crate::record::{Fields, Level, LogRecord};
use std::fmt::Display;
use std::panic::Location;
use std::sync::OnceLock;

#[track_caller]
pub fn log(level: Level, message: impl Display) {
    match global::current() {
        Some(logger) => logger.log(level, message),
        None => fallback(LogRecord::new(level, message.to_string())),
    }
}

#[track_caller]
pub fn log_with_fields(level: Level, fields: Fields, message: impl Display) {
    match global::current() {
        Some(logger) => logger.log_with_fields(level, fields, message),
        None => fallback(LogRecord::new(level, message.to_string()).with_fields(fields)),
    }
}

#[track_caller]
fn fallback(record: LogRecord) {
    static STDERR: OnceLock<LocalSink> = OnceLock::new();
    let record = record.with_caller(Location::caller().into());
    let _ = STDERR.get_or_init(LocalSink::stderr).write(&record);
}

macro_rules! level_fns {
    ($($level:ident => $plain:ident, $with_fields:ident;)+) => {
        $(
            #[track_caller]
            pub fn $plain(message: impl Display) {
                log(Level::$level, message)
            }

            #[track_caller]
            pub fn $with_fields(fields: Fields, message: impl Display) {
                log_with_fields(Level::$level, fields, message)
            }
        )+
    };
}

level_fns! {
    Trace => trace, with_fields_trace;
    Debug => debug, with_fields_debug;
    Info => info, with_fields_info;
    Warn => warn, with_fields_warn;
    Error => error, with_fields_error;
    Fatal => fatal, with_fields_fatal;
    Panic => panic, with_fields_panic;
}
