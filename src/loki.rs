use crate::record::{LogRecord, Value};
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;

/// Sink that pushes batches to a Loki-compatible `/loki/api/v1/push`
/// endpoint as JSON.
///
/// Each batch becomes one request with one stream per level; the static
/// `labels` are attached to every stream next to `level`.
#[derive(Clone)]
pub struct LokiSink {
    client: Client,
    endpoint: Url,
    labels: BTreeMap<String, String>,
}

impl LokiSink {
    /// Build a sink for an already validated endpoint.
    pub fn new(
        endpoint: Url,
        labels: BTreeMap<String, String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint,
            labels,
        })
    }

    fn push_request(&self, records: &[LogRecord]) -> PushRequest {
        let mut ordered: Vec<&LogRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.timestamp);

        let mut by_level: BTreeMap<&'static str, Vec<[String; 2]>> = BTreeMap::new();
        for record in ordered {
            let ts = record
                .timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_string();
            by_level
                .entry(record.level.as_str())
                .or_default()
                .push([ts, line(record)]);
        }

        let streams = by_level
            .into_iter()
            .map(|(level, values)| {
                let mut stream = self.labels.clone();
                stream.insert("level".to_string(), level.to_string());
                PushStream { stream, values }
            })
            .collect();

        PushRequest { streams }
    }
}

/// JSON body of a single pushed line: message, caller and the fields that
/// were explicitly attached to the record.
fn line(record: &LogRecord) -> String {
    let mut body = serde_json::Map::with_capacity(record.fields.len() + 2);
    for (key, value) in &record.fields {
        body.insert(key.clone(), value.clone());
    }
    body.insert("msg".to_string(), Value::String(record.message.clone()));
    if let Some(caller) = &record.caller {
        body.insert("caller".to_string(), Value::String(caller.to_string()));
    }
    Value::Object(body).to_string()
}

#[derive(Serialize)]
struct PushRequest {
    streams: Vec<PushStream>,
}

#[derive(Serialize)]
struct PushStream {
    stream: BTreeMap<String, String>,
    values: Vec<[String; 2]>,
}

#[async_trait]
impl LogSink for LokiSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.send_batch(std::slice::from_ref(record)).await
    }

    async fn send_batch(&self, records: &[LogRecord]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if records.is_empty() {
            return Ok(());
        }

        let body = self.push_request(records);
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("Loki push failed with status {}: {}", status, text).into())
        }
    }
}
