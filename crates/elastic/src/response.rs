//! Response envelopes.
//!
//! Parses the JSON bodies returned by search, get, multi-get, count and bulk
//! requests into typed values.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BulkItemFailure;

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<T> {
    pub index: String,
    pub id: String,
    pub score: Option<f64>,
    pub source: T,
}

/// The full envelope of a search response.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse<T> {
    /// Server-side execution time in milliseconds.
    pub took: u64,
    pub timed_out: bool,
    /// Total matching documents (may be a lower bound when the engine
    /// stops counting).
    pub total: u64,
    pub max_score: Option<f64>,
    pub hits: Vec<Hit<T>>,
    /// Aggregation results keyed by aggregation name.
    pub aggregations: Map<String, Value>,
}

impl<T: DeserializeOwned> SearchResponse<T> {
    /// Parses a search response body. Hits without `_source` are skipped.
    pub fn from_body(body: Value) -> Result<Self, serde_json::Error> {
        let raw: RawSearchResponse<T> = serde_json::from_value(body)?;

        let hits = raw
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| {
                hit.source.map(|source| Hit {
                    index: hit.index,
                    id: hit.id,
                    score: hit.score,
                    source,
                })
            })
            .collect();

        Ok(Self {
            took: raw.took,
            timed_out: raw.timed_out,
            total: raw.hits.total.map(RawTotal::value).unwrap_or(0),
            max_score: raw.hits.max_score,
            hits,
            aggregations: raw.aggregations.unwrap_or_default(),
        })
    }
}

impl<T> SearchResponse<T> {
    /// Borrows the hit sources.
    pub fn documents(&self) -> Vec<&T> {
        self.hits.iter().map(|h| &h.source).collect()
    }

    /// Consumes the response, returning the hit sources.
    pub fn into_documents(self) -> Vec<T> {
        self.hits.into_iter().map(|h| h.source).collect()
    }

    /// Returns an aggregation result by name.
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.get(name)
    }

    /// Returns the buckets of a bucket aggregation.
    pub fn buckets(&self, name: &str) -> Vec<&Value> {
        self.aggregation(name)
            .and_then(|a| a.get("buckets"))
            .and_then(|b| b.as_array())
            .map(|b| b.iter().collect())
            .unwrap_or_default()
    }

    /// Returns the `value` of a metric aggregation.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.aggregation(name)
            .and_then(|a| a.get("value"))
            .and_then(|v| v.as_f64())
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Deserialize)]
struct RawSearchResponse<T> {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    timed_out: bool,
    hits: RawHits<T>,
    #[serde(default)]
    aggregations: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawHits<T> {
    #[serde(default)]
    total: Option<RawTotal>,
    #[serde(default)]
    max_score: Option<f64>,
    #[serde(default = "Vec::new")]
    hits: Vec<RawHit<T>>,
}

/// `hits.total` is an object on 7.x+ and a bare number when
/// `rest_total_hits_as_int` is set.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
    Count(u64),
    Object { value: u64 },
}

impl RawTotal {
    fn value(self) -> u64 {
        match self {
            RawTotal::Count(n) => n,
            RawTotal::Object { value } => value,
        }
    }
}

#[derive(Deserialize)]
struct RawHit<T> {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default = "Option::default")]
    source: Option<T>,
}

/// Body of a single-document get.
#[derive(Deserialize)]
pub(crate) struct GetResponse<T> {
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default = "Option::default")]
    pub source: Option<T>,
}

/// Body of a multi-get.
#[derive(Deserialize)]
pub(crate) struct MultiGetResponse<T> {
    #[serde(default = "Vec::new")]
    pub docs: Vec<GetResponse<T>>,
}

impl<T> MultiGetResponse<T> {
    /// Returns the found sources in request order.
    pub fn into_found(self) -> Vec<T> {
        self.docs
            .into_iter()
            .filter(|d| d.found)
            .filter_map(|d| d.source)
            .collect()
    }
}

/// Body of a `_count` request.
#[derive(Deserialize)]
pub(crate) struct CountResponse {
    pub count: u64,
}

/// Body of a `_delete_by_query` request.
#[derive(Deserialize)]
pub(crate) struct DeleteByQueryResponse {
    #[serde(default)]
    pub deleted: u64,
}

/// Extracts failed items from a bulk response body.
pub(crate) fn bulk_failures(body: &Value) -> Vec<BulkItemFailure> {
    if !body.get("errors").and_then(|e| e.as_bool()).unwrap_or(false) {
        return Vec::new();
    }

    body.get("items")
        .and_then(|items| items.as_array())
        .map(|items| {
            items
                .iter()
                // Each item is `{ "<action>": { ... } }`.
                .filter_map(|item| item.as_object().and_then(|obj| obj.values().next()))
                .filter(|result| result.get("error").is_some())
                .map(|result| BulkItemFailure {
                    id: result.get("_id").and_then(|v| v.as_str()).map(String::from),
                    status: result.get("status").and_then(|s| s.as_u64()).unwrap_or(0) as u16,
                    reason: result
                        .get("error")
                        .map(|e| match e.get("reason").and_then(|r| r.as_str()) {
                            Some(reason) => reason.to_string(),
                            None => e.to_string(),
                        })
                        .unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Product {
        id: String,
        name: String,
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "took": 3,
            "timed_out": false,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "max_score": 1.2,
                "hits": [
                    {"_index": "product", "_id": "1", "_score": 1.2, "_source": {"id": "1", "name": "Phone"}},
                    {"_index": "product", "_id": "2", "_score": 0.7, "_source": {"id": "2", "name": "Photo"}}
                ]
            },
            "aggregations": {
                "avg_price": {"value": 12.5},
                "brands": {"buckets": [{"key": "acme", "doc_count": 2}]}
            }
        });

        let response: SearchResponse<Product> = SearchResponse::from_body(body).unwrap();
        assert_eq!(response.took, 3);
        assert_eq!(response.total, 2);
        assert_eq!(response.hits[0].id, "1");
        assert_eq!(response.hits[1].score, Some(0.7));
        assert_eq!(response.metric("avg_price"), Some(12.5));
        assert_eq!(response.buckets("brands").len(), 1);
        assert!(response.buckets("missing").is_empty());

        let docs = response.into_documents();
        assert_eq!(docs[1].name, "Photo");
    }

    #[test]
    fn test_parse_integer_total_and_missing_source() {
        let body = json!({
            "took": 1,
            "timed_out": false,
            "hits": {
                "total": 5,
                "max_score": null,
                "hits": [
                    {"_index": "product", "_id": "1", "_score": null}
                ]
            }
        });
        let response: SearchResponse<Product> = SearchResponse::from_body(body).unwrap();
        assert_eq!(response.total, 5);
        assert!(response.is_empty());
        assert!(response.aggregations.is_empty());
    }

    #[test]
    fn test_multi_get_skips_missing() {
        let body = json!({
            "docs": [
                {"_index": "product", "_id": "1", "found": true, "_source": {"id": "1", "name": "A"}},
                {"_index": "product", "_id": "2", "found": false},
                {"_index": "product", "_id": "3", "found": true, "_source": {"id": "3", "name": "C"}}
            ]
        });
        let response: MultiGetResponse<Product> = serde_json::from_value(body).unwrap();
        let found = response.into_found();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].id, "3");
    }

    #[test]
    fn test_bulk_failures() {
        let body = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [price]"}}}
            ]
        });
        let failures = bulk_failures(&body);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id.as_deref(), Some("2"));
        assert_eq!(failures[0].status, 400);
        assert_eq!(failures[0].reason, "failed to parse field [price]");

        assert!(bulk_failures(&json!({"errors": false, "items": []})).is_empty());
    }
}
