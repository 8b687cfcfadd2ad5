//! ECS-shaped log records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};

/// Field holding the formatted event message.
pub(crate) const MESSAGE_FIELD: &str = "message";
/// Field holding error details.
pub(crate) const ERROR_FIELD: &str = "error";

/// One log event as written to Elasticsearch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "log.level")]
    pub level: String,
    /// The event target (usually the module path).
    #[serde(rename = "log.logger")]
    pub logger: String,
    pub message: String,
    /// Structured event fields other than message, error and correlation id.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub labels: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(rename = "error.message", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "service.name", skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// Collects event fields into record parts.
#[derive(Debug, Default)]
pub(crate) struct RecordVisitor {
    pub message: Option<String>,
    pub error: Option<String>,
    pub correlation_id: Option<String>,
    pub labels: Map<String, Value>,
}

impl RecordVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(value_text(value)),
            ERROR_FIELD => self.error = Some(value_text(value)),
            super::correlation::CORRELATION_ID_FIELD => {
                self.correlation_id = Some(value_text(value))
            }
            name => {
                self.labels.insert(name.to_string(), value);
            }
        }
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Visit for RecordVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_serializes_ecs_fields() {
        let mut labels = Map::new();
        labels.insert("index".to_string(), json!("product"));

        let record = LogRecord {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            level: "error".to_string(),
            logger: "helios_elastic::client".to_string(),
            message: "Elasticsearch request failed".to_string(),
            labels,
            correlation_id: Some("c0ffee".to_string()),
            error_message: Some("connection refused".to_string()),
            service_name: Some("catalog-api".to_string()),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["@timestamp"], "2026-03-14T09:26:53Z");
        assert_eq!(value["log.level"], "error");
        assert_eq!(value["log.logger"], "helios_elastic::client");
        assert_eq!(value["labels"]["index"], "product");
        assert_eq!(value["error.message"], "connection refused");
        assert_eq!(value["service.name"], "catalog-api");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let record = LogRecord {
            timestamp: Utc::now(),
            level: "info".to_string(),
            logger: "app".to_string(),
            message: "started".to_string(),
            labels: Map::new(),
            correlation_id: None,
            error_message: None,
            service_name: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("labels"));
        assert!(!object.contains_key("correlation_id"));
        assert!(!object.contains_key("error.message"));
        assert!(!object.contains_key("service.name"));
    }
}
