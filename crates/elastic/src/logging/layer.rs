//! Tracing layer that queues events for shipping to Elasticsearch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use super::correlation::CorrelationId;
use super::record::{LogRecord, RecordVisitor};

/// Targets never shipped: the transport stack the shipper itself uses.
const TRANSPORT_TARGETS: &[&str] = &["elasticsearch", "reqwest", "hyper", "hyper_util", "h2"];

/// Converts tracing events into [`LogRecord`]s and enqueues them without
/// blocking. When the queue is full the record is dropped and counted.
pub struct ElasticLogLayer {
    sender: mpsc::Sender<LogRecord>,
    service_name: Option<String>,
    excluded_targets: Vec<String>,
    dropped: Arc<AtomicU64>,
}

impl ElasticLogLayer {
    pub(crate) fn new(
        sender: mpsc::Sender<LogRecord>,
        service_name: Option<String>,
        excluded_targets: Vec<String>,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        Self {
            sender,
            service_name,
            excluded_targets,
            dropped,
        }
    }

    /// Returns true if events from `target` are not shipped.
    pub fn is_excluded(&self, target: &str) -> bool {
        TRANSPORT_TARGETS
            .iter()
            .copied()
            .chain(self.excluded_targets.iter().map(String::as_str))
            .any(|prefix| target_matches(target, prefix))
    }
}

fn target_matches(target: &str, prefix: &str) -> bool {
    target == prefix
        || target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with("::"))
}

impl<S> Layer<S> for ElasticLogLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        attrs.record(&mut visitor);

        if let (Some(correlation_id), Some(span)) = (visitor.correlation_id, ctx.span(id)) {
            span.extensions_mut().replace(CorrelationId(correlation_id));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut visitor = RecordVisitor::default();
        values.record(&mut visitor);

        if let (Some(correlation_id), Some(span)) = (visitor.correlation_id, ctx.span(id)) {
            span.extensions_mut().replace(CorrelationId(correlation_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_excluded(metadata.target()) {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        // Nearest enclosing span wins.
        let correlation_id = visitor.correlation_id.or_else(|| {
            ctx.event_scope(event).and_then(|scope| {
                scope.into_iter().find_map(|span| {
                    let extensions = span.extensions();
                    extensions.get::<CorrelationId>().map(|c| c.0.clone())
                })
            })
        });

        let record = LogRecord {
            timestamp: Utc::now(),
            level: metadata.level().as_str().to_lowercase(),
            logger: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            labels: visitor.labels,
            correlation_id,
            error_message: visitor.error,
            service_name: self.service_name.clone(),
        };

        if self.sender.try_send(record).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
