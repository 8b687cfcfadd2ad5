//! Background task that bulk-writes queued log records.
//!
//! Failures here are reported on stderr: logging them through `tracing`
//! would feed them back into the queue.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};
use elasticsearch::indices::IndicesPutIndexTemplateParts;
use elasticsearch::{BulkOperation, BulkParts};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::client::{ElasticClient, Media};
use crate::response::bulk_failures;

use super::record::LogRecord;

/// Priority of the log index template. Above the built-in `logs-*-*`
/// data stream template (100).
pub const LOG_TEMPLATE_PRIORITY: u32 = 200;

/// Expands the strftime placeholders of an index format for a point in time.
///
/// Index names must be lower case; the result is lower-cased. A format with
/// invalid placeholders is used verbatim.
pub fn format_index_name(format: &str, at: DateTime<Utc>) -> String {
    let mut name = String::new();
    if write!(name, "{}", at.format(format)).is_err() {
        return format.to_lowercase();
    }
    name.to_lowercase()
}

/// The index pattern matching every index an index format expands to:
/// everything before the first placeholder, followed by `*`.
pub fn index_pattern(format: &str) -> String {
    match format.find('%') {
        Some(pos) => format!("{}*", &format[..pos]).to_lowercase(),
        None => format.to_lowercase(),
    }
}

/// Name of the index template registered for an index pattern.
fn template_name(pattern: &str) -> String {
    let name = pattern.trim_end_matches(['*', '-', '.', '_']);
    if name.is_empty() {
        "logs".to_string()
    } else {
        name.to_string()
    }
}

/// Composable index template body for log indices.
pub(crate) fn log_template_body(pattern: &str) -> Value {
    json!({
        "index_patterns": [pattern],
        "priority": LOG_TEMPLATE_PRIORITY,
        "template": {
            "mappings": {
                "properties": {
                    "@timestamp": { "type": "date" },
                    "log": {
                        "properties": {
                            "level": { "type": "keyword" },
                            "logger": { "type": "keyword" }
                        }
                    },
                    "message": { "type": "text" },
                    "labels": { "type": "object", "dynamic": true },
                    "correlation_id": { "type": "keyword" },
                    "error": {
                        "properties": {
                            "message": { "type": "text" }
                        }
                    },
                    "service": {
                        "properties": {
                            "name": { "type": "keyword" }
                        }
                    }
                }
            }
        }
    })
}

pub(crate) struct LogShipper {
    client: ElasticClient,
    receiver: mpsc::Receiver<LogRecord>,
    shutdown: oneshot::Receiver<()>,
    index_format: String,
    batch_size: usize,
    flush_interval: Duration,
    register_template: bool,
}

impl LogShipper {
    pub(crate) fn new(
        client: ElasticClient,
        receiver: mpsc::Receiver<LogRecord>,
        shutdown: oneshot::Receiver<()>,
        index_format: String,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            client,
            receiver,
            shutdown,
            index_format,
            batch_size: batch_size.max(1),
            flush_interval,
            register_template: false,
        }
    }

    /// Registers the log index template before the first batch.
    pub(crate) fn with_template(mut self, register: bool) -> Self {
        self.register_template = register;
        self
    }

    /// Drains the queue until shutdown is signalled, the guard is dropped,
    /// or every sender is gone. Pending records are flushed before returning.
    pub(crate) async fn run(mut self) {
        if self.register_template {
            self.put_template().await;
        }

        let mut batch: Vec<LogRecord> = Vec::with_capacity(self.batch_size);
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.receiver.recv() => match received {
                    Some(record) => {
                        batch.push(record);
                        if batch.len() >= self.batch_size {
                            self.flush(&mut batch).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    self.flush(&mut batch).await;
                }
                _ = &mut self.shutdown => {
                    self.receiver.close();
                    while let Ok(record) = self.receiver.try_recv() {
                        batch.push(record);
                    }
                    break;
                }
            }
        }

        self.flush(&mut batch).await;
    }

    async fn put_template(&self) {
        let pattern = index_pattern(&self.index_format);
        let name = template_name(&pattern);

        let indices = self.client.inner().indices();
        let request = indices
            .put_index_template(IndicesPutIndexTemplateParts::Name(&name))
            .body(log_template_body(&pattern));
        let result = self
            .client
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await;

        match result {
            Ok(response) if response.status_code().is_success() => {}
            Ok(response) => eprintln!(
                "Failed to register log index template '{}': status {}",
                name,
                response.status_code()
            ),
            Err(e) => eprintln!("Failed to register log index template '{}': {}", name, e),
        }
    }

    async fn flush(&self, batch: &mut Vec<LogRecord>) {
        if batch.is_empty() {
            return;
        }

        // A batch spanning midnight lands in two daily indices.
        let mut by_index: BTreeMap<String, Vec<LogRecord>> = BTreeMap::new();
        for record in batch.drain(..) {
            let index = format_index_name(&self.index_format, record.timestamp);
            by_index.entry(index).or_default().push(record);
        }

        for (index, records) in by_index {
            self.ship(&index, records).await;
        }
    }

    async fn ship(&self, index: &str, records: Vec<LogRecord>) {
        let count = records.len();
        let operations: Vec<BulkOperation<LogRecord>> = records
            .into_iter()
            .map(|record| BulkOperation::create(record).id(Uuid::new_v4().to_string()).into())
            .collect();

        let request = self
            .client
            .inner()
            .bulk(BulkParts::Index(index))
            .body(operations);
        let result = self
            .client
            .versioned(request, Media::NdJson, |r, k, v| r.header(k, v))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                eprintln!("Failed to ship {} log record(s) to '{}': {}", count, index, e);
                return;
            }
        };

        let status = response.status_code();
        if !status.is_success() {
            eprintln!(
                "Failed to ship {} log record(s) to '{}': status {}",
                count, index, status
            );
            return;
        }

        match response.json::<Value>().await {
            Ok(body) => {
                let failed = bulk_failures(&body);
                if let Some(first) = failed.first() {
                    eprintln!(
                        "{} of {} log record(s) rejected by '{}', first: {}",
                        failed.len(),
                        count,
                        index,
                        first
                    );
                }
            }
            Err(e) => eprintln!("Failed to read log shipping response from '{}': {}", index, e),
        }
    }
}
