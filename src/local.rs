//! Console + file output for every record, independent of the remote side.

use crate::error::InitError;
use crate::record::{LogRecord, Value};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, OptionalWriter};
use tracing_subscriber::fmt::MakeWriter;

const FILE_TIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File name for a run started at `started` with the given tag, e.g.
/// `2024-01-05 13-04-09_game server.log`.
pub fn log_file_name(tag: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.log", started.format(FILE_TIME_FORMAT), tag)
}

/// Synchronous sink that renders records as text lines.
///
/// Console and file targets are combined into one [`MakeWriter`] with
/// [`MakeWriterExt::and`]. Each record is a single `write_all` per target.
pub struct LocalSink {
    writer: BoxMakeWriter,
    path: Option<PathBuf>,
}

impl LocalSink {
    /// Open `<dir>/<timestamp>_<tag>.log` (append, created if missing) and
    /// fan out to it plus, when `stdout` is set, the console.
    pub fn open(dir: &Path, tag: &str, stdout: bool) -> Result<Self, InitError> {
        Self::open_at(dir, tag, stdout, Local::now())
    }

    pub(crate) fn open_at(
        dir: &Path,
        tag: &str,
        stdout: bool,
        started: DateTime<Local>,
    ) -> Result<Self, InitError> {
        fs::create_dir_all(dir).map_err(|source| InitError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(log_file_name(tag, started));
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| InitError::OpenFile {
                path: path.clone(),
                source,
            })?;

        let console = move || {
            if stdout {
                OptionalWriter::some(io::stdout())
            } else {
                OptionalWriter::none()
            }
        };
        let writer = BoxMakeWriter::new(console.and(std::sync::Mutex::new(file)));

        Ok(Self {
            writer,
            path: Some(path),
        })
    }

    /// Sink over an arbitrary writer factory, with no backing file.
    pub fn from_make_writer<M>(make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            writer: BoxMakeWriter::new(make_writer),
            path: None,
        }
    }

    /// Sink that only prints to stderr. Used before the logger is initialized.
    pub fn stderr() -> Self {
        Self::from_make_writer(io::stderr)
    }

    /// Path of the file this sink appends to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn write(&self, record: &LogRecord) -> io::Result<()> {
        let line = render(record);
        self.writer.make_writer().write_all(line.as_bytes())
    }

    pub fn flush(&self) -> io::Result<()> {
        self.writer.make_writer().flush()
    }
}

impl std::fmt::Debug for LocalSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSink").field("path", &self.path).finish()
    }
}

/// Render a record as one `key=value` line terminated by `\n`.
///
/// Column order is `time level caller msg` followed by the fields sorted
/// by key.
pub fn render(record: &LogRecord) -> String {
    let mut line = String::with_capacity(96 + record.message.len());
    let time = record.timestamp.with_timezone(&Local);
    let _ = write!(line, "time=\"{}\" level={}", time.format(LINE_TIME_FORMAT), record.level);
    if let Some(caller) = &record.caller {
        line.push_str(" caller=");
        push_text(&mut line, &caller.to_string());
    }
    line.push_str(" msg=");
    push_text(&mut line, &record.message);
    for (key, value) in &record.fields {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        push_value(&mut line, value);
    }
    line.push('\n');
    line
}

fn push_value(line: &mut String, value: &Value) {
    match value {
        Value::String(s) => push_text(line, s),
        Value::Null => line.push_str("<nil>"),
        Value::Bool(_) | Value::Number(_) => {
            let _ = write!(line, "{}", value);
        }
        Value::Array(_) | Value::Object(_) => push_text(line, &value.to_string()),
    }
}

fn push_text(line: &mut String, text: &str) {
    if needs_quoting(text) {
        let _ = write!(line, "{:?}", text);
    } else {
        line.push_str(text);
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || !text.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+' | ':')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::record::{Caller, Level};
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Writer handing its bytes to a shared buffer so tests can inspect them.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuf {
        type Writer = SharedBuf;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn file_name_is_numeric_and_tagged() {
        let started = Local.with_ymd_and_hms(2024, 1, 5, 13, 4, 9).unwrap();
        assert_eq!(log_file_name("game server", started), "2024-01-05 13-04-09_game server.log");
    }

    #[test]
    fn file_names_one_second_apart_differ() {
        let started = Local.with_ymd_and_hms(2024, 1, 5, 13, 4, 9).unwrap();
        let later = started + Duration::seconds(1);
        assert_ne!(log_file_name("svc", started), log_file_name("svc", later));
    }

    #[test]
    fn render_contains_all_columns() {
        let record = LogRecord::new(Level::Warn, "ping to google")
            .with_fields(fields! { "url" => "http://google.com", "status" => 404 })
            .with_caller(Caller::new("src/main.rs", 7));

        let line = render(&record);
        assert!(line.starts_with("time=\""));
        assert!(line.contains(" level=warn "));
        assert!(line.contains(" caller=src/main.rs:7 "));
        assert!(line.contains(" msg=\"ping to google\""));
        assert!(line.contains(" status=404"));
        assert!(line.contains(" url=http://google.com"));
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn render_quotes_values_that_would_break_the_line() {
        let record = LogRecord::new(Level::Info, "")
            .with_fields(fields! { "err" => "error 404 found", "nested" => serde_json::json!({"a": 1}) });

        let line = render(&record);
        assert!(line.contains(" msg=\"\""));
        assert!(line.contains(" err=\"error 404 found\""));
        assert!(line.contains(r#" nested="{\"a\":1}""#));
    }

    #[test]
    fn teed_writers_see_every_line() {
        let a = SharedBuf::default();
        let b = SharedBuf::default();
        let sink = LocalSink::from_make_writer(a.clone().and(b.clone()));

        sink.write(&LogRecord::new(Level::Info, "test")).unwrap();
        sink.write(&LogRecord::new(Level::Error, "error")).unwrap();

        assert_eq!(a.contents(), b.contents());
        assert_eq!(a.contents().lines().count(), 2);
        assert!(sink.path().is_none());
    }

    #[test]
    fn open_creates_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("log");
        let started = Local.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let sink = LocalSink::open_at(&log_dir, "svc", false, started).unwrap();
        sink.write(&LogRecord::new(Level::Info, "hello")).unwrap();

        let path = sink.path().unwrap().to_path_buf();
        assert_eq!(path, log_dir.join("2024-03-01 08-00-00_svc.log"));
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("msg=hello"));
    }

    #[test]
    fn reopening_the_same_name_appends() {
        let dir = tempfile::tempdir().unwrap();
        let started = Local.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let first = LocalSink::open_at(dir.path(), "svc", false, started).unwrap();
        first.write(&LogRecord::new(Level::Info, "one")).unwrap();
        let second = LocalSink::open_at(dir.path(), "svc", false, started).unwrap();
        second.write(&LogRecord::new(Level::Info, "two")).unwrap();

        let contents = fs::read_to_string(second.path().unwrap()).unwrap();
        assert!(contents.contains("msg=one"));
        assert!(contents.contains("msg=two"));
    }

    #[test]
    fn open_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("log");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = LocalSink::open(&blocker, "svc", false).err().unwrap();
        assert!(matches!(err, InitError::CreateDir { .. }));
    }
}
