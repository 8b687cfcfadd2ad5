//! Search and get request builders.

use serde_json::{Value, json};

use super::{Aggregations, Query};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A sort criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct SortDirective {
    pub field: String,
    pub order: SortOrder,
}

impl SortDirective {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    fn to_dsl(&self) -> Value {
        let order = match self.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        json!({ self.field.as_str(): { "order": order } })
    }
}

/// A fully caller-controlled search request.
///
/// Without an explicit index the repository's own index is searched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub index: Option<String>,
    pub query: Query,
    pub from: Option<u64>,
    pub size: Option<u64>,
    pub sort: Vec<SortDirective>,
    pub aggregations: Aggregations,
    pub source_includes: Vec<String>,
    pub source_excludes: Vec<String>,
    pub track_total_hits: Option<bool>,
    pub min_score: Option<f64>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new(Query::MatchAll)
    }
}

impl SearchRequest {
    /// Creates a request for the given query with engine defaults for
    /// paging and sorting.
    pub fn new(query: Query) -> Self {
        Self {
            index: None,
            query,
            from: None,
            size: None,
            sort: Vec::new(),
            aggregations: Aggregations::new(),
            source_includes: Vec::new(),
            source_excludes: Vec::new(),
            track_total_hits: None,
            min_score: None,
        }
    }

    /// Searches an explicit index instead of the repository's.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn sort(mut self, directive: SortDirective) -> Self {
        self.sort.push(directive);
        self
    }

    pub fn aggregations(mut self, aggregations: Aggregations) -> Self {
        self.aggregations = aggregations;
        self
    }

    pub fn include_source(mut self, field: impl Into<String>) -> Self {
        self.source_includes.push(field.into());
        self
    }

    pub fn exclude_source(mut self, field: impl Into<String>) -> Self {
        self.source_excludes.push(field.into());
        self
    }

    pub fn track_total_hits(mut self, track: bool) -> Self {
        self.track_total_hits = Some(track);
        self
    }

    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = Some(score);
        self
    }

    /// Builds the request body.
    pub fn body(&self) -> Value {
        let mut body = json!({ "query": self.query.to_dsl() });

        if let Some(from) = self.from {
            body["from"] = json!(from);
        }
        if let Some(size) = self.size {
            body["size"] = json!(size);
        }
        if !self.sort.is_empty() {
            body["sort"] = Value::Array(self.sort.iter().map(SortDirective::to_dsl).collect());
        }
        if !self.aggregations.is_empty() {
            body["aggs"] = self.aggregations.to_dsl();
        }
        if !self.source_includes.is_empty() || !self.source_excludes.is_empty() {
            let mut source = json!({});
            if !self.source_includes.is_empty() {
                source["includes"] = json!(self.source_includes);
            }
            if !self.source_excludes.is_empty() {
                source["excludes"] = json!(self.source_excludes);
            }
            body["_source"] = source;
        }
        if let Some(track) = self.track_total_hits {
            body["track_total_hits"] = json!(track);
        }
        if let Some(score) = self.min_score {
            body["min_score"] = json!(score);
        }

        body
    }
}

/// A caller-shaped single-document fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    pub id: String,
    pub index: Option<String>,
    pub routing: Option<String>,
    pub preference: Option<String>,
    pub realtime: Option<bool>,
    pub source_includes: Vec<String>,
    pub source_excludes: Vec<String>,
}

impl GetRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Fetches from an explicit index instead of the repository's.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    pub fn preference(mut self, preference: impl Into<String>) -> Self {
        self.preference = Some(preference.into());
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = Some(realtime);
        self
    }

    pub fn include_source(mut self, field: impl Into<String>) -> Self {
        self.source_includes.push(field.into());
        self
    }

    pub fn exclude_source(mut self, field: impl Into<String>) -> Self {
        self.source_excludes.push(field.into());
        self
    }
}
