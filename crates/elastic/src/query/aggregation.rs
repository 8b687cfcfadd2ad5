//! Aggregation definitions.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// A single aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Buckets per distinct value.
    Terms {
        field: String,
        size: Option<u32>,
        sub: Aggregations,
    },
    /// Buckets per calendar interval (`day`, `month`, ...).
    DateHistogram {
        field: String,
        calendar_interval: String,
        sub: Aggregations,
    },
    /// Buckets per fixed numeric interval.
    Histogram { field: String, interval: f64 },
    Avg { field: String },
    Sum { field: String },
    Min { field: String },
    Max { field: String },
    /// Approximate distinct count.
    Cardinality { field: String },
    ValueCount { field: String },
    /// An aggregation body passed through unchanged.
    Raw(Value),
}

impl Aggregation {
    /// Terms aggregation without sub-aggregations.
    pub fn terms(field: impl Into<String>, size: Option<u32>) -> Self {
        Aggregation::Terms {
            field: field.into(),
            size,
            sub: Aggregations::new(),
        }
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Aggregation::Avg {
            field: field.into(),
        }
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Aggregation::Sum {
            field: field.into(),
        }
    }

    /// Translates the aggregation to JSON.
    pub fn to_dsl(&self) -> Value {
        match self {
            Aggregation::Terms { field, size, sub } => {
                let mut terms = json!({ "field": field });
                if let Some(size) = size {
                    terms["size"] = json!(size);
                }
                with_sub(json!({ "terms": terms }), sub)
            }
            Aggregation::DateHistogram {
                field,
                calendar_interval,
                sub,
            } => with_sub(
                json!({ "date_histogram": { "field": field, "calendar_interval": calendar_interval } }),
                sub,
            ),
            Aggregation::Histogram { field, interval } => {
                json!({ "histogram": { "field": field, "interval": interval } })
            }
            Aggregation::Avg { field } => json!({ "avg": { "field": field } }),
            Aggregation::Sum { field } => json!({ "sum": { "field": field } }),
            Aggregation::Min { field } => json!({ "min": { "field": field } }),
            Aggregation::Max { field } => json!({ "max": { "field": field } }),
            Aggregation::Cardinality { field } => json!({ "cardinality": { "field": field } }),
            Aggregation::ValueCount { field } => json!({ "value_count": { "field": field } }),
            Aggregation::Raw(value) => value.clone(),
        }
    }
}

fn with_sub(mut agg: Value, sub: &Aggregations) -> Value {
    if !sub.is_empty() {
        agg["aggs"] = sub.to_dsl();
    }
    agg
}

/// Named aggregations of a search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregations(BTreeMap<String, Aggregation>);

impl Aggregations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named aggregation.
    pub fn add(mut self, name: impl Into<String>, aggregation: Aggregation) -> Self {
        self.0.insert(name.into(), aggregation);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Translates all aggregations to the `aggs` JSON object.
    pub fn to_dsl(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(name, agg)| (name.clone(), agg.to_dsl()))
            .collect();
        Value::Object(map)
    }
}
