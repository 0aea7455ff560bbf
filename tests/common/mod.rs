#![allow(dead_code)]

use async_trait::async_trait;
use log_fanout::backend::Connector;
use log_fanout::{ConnectionError, LogRecord, RemoteConfig};
use log_fanout::sink::LogSink;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sink remembering every record and how often it was flushed.
#[derive(Default)]
pub struct RecordingSink {
    pub endpoint: String,
    pub labels: BTreeMap<String, String>,
    pub records: Mutex<Vec<LogRecord>>,
    pub flushes: AtomicUsize,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.message.clone()).collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out [`RecordingSink`]s and keeping every one it built.
/// Endpoints containing `unreachable` are refused.
#[derive(Clone, Default)]
pub struct Recorder {
    pub sinks: Arc<Mutex<Vec<Arc<RecordingSink>>>>,
}

impl Recorder {
    pub fn connector(&self) -> Connector {
        let sinks = Arc::clone(&self.sinks);
        Arc::new(move |config: &RemoteConfig| {
            if config.endpoint.contains("unreachable") {
                return Err(ConnectionError::Client(format!(
                    "connection refused: {}",
                    config.endpoint
                )));
            }
            let sink = Arc::new(RecordingSink {
                endpoint: config.endpoint.clone(),
                labels: config.labels.clone(),
                ..RecordingSink::default()
            });
            sinks.lock().push(Arc::clone(&sink));
            Ok(sink as Arc<dyn LogSink>)
        })
    }

    pub fn sink(&self, idx: usize) -> Arc<RecordingSink> {
        Arc::clone(&self.sinks.lock()[idx])
    }

    pub fn count(&self) -> usize {
        self.sinks.lock().len()
    }
}

pub fn remote_config(endpoint: &str) -> RemoteConfig {
    let mut config = RemoteConfig::new(endpoint, 1, Duration::from_secs(60));
    config.close_timeout = Duration::from_secs(2);
    config
}

pub fn read_log(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

pub fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    done()
}

/// Minimal HTTP/1.1 push endpoint on localhost answering every request with
/// `204 No Content`. Returns the push URL and the number of requests served.
pub fn spawn_push_endpoint() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));
    let served = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let served = Arc::clone(&served);
            thread::spawn(move || serve(stream, &served));
        }
    });

    (format!("http://{addr}/loki/api/v1/push"), requests)
}

fn serve(stream: TcpStream, served: &AtomicUsize) {
    let Ok(read_half) = stream.try_clone() else { return };
    let mut reader = BufReader::new(read_half);
    let mut writer = stream;
    let mut line = String::new();

    // Keep-alive: one iteration per request on the connection.
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let mut content_length = 0usize;
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }
        let mut body = vec![0; content_length];
        if reader.read_exact(&mut body).is_err() {
            return;
        }
        served.fetch_add(1, Ordering::SeqCst);
        if writer.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").is_err() {
            return;
        }
    }
}
