//! Typed query model.
//!
//! Callers describe what to match with [`Query`] values (or the simpler
//! field/operator/value [`Condition`]s) instead of engine-specific builder
//! callbacks. Translation to Elasticsearch Query DSL JSON happens at the
//! boundary in [`query_builder`].
//!
//! ```
//! use helios_elastic::query::{Condition, Query};
//!
//! let query = Query::all([
//!     Condition::eq("status", "active"),
//!     Condition::gte("price", 10),
//! ]);
//! let dsl = query.to_dsl();
//! assert_eq!(dsl["bool"]["filter"][0]["term"]["status"]["value"], "active");
//! ```

pub mod aggregation;
pub mod query_builder;
pub mod request;

use serde_json::Value;

pub use aggregation::{Aggregation, Aggregations};
pub use request::{GetRequest, SearchRequest, SortDirective, SortOrder};

/// A search query.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document.
    MatchAll,
    /// Matches no document.
    MatchNone,
    /// Exact value match on a keyword/numeric field.
    Term { field: String, value: Value },
    /// Exact match against any of several values.
    Terms { field: String, values: Vec<Value> },
    /// Documents with the given ids.
    Ids(Vec<String>),
    /// Analyzed full-text match.
    Match {
        field: String,
        query: String,
        operator: Option<MatchOperator>,
    },
    /// Matches documents whose field begins with the phrase fragment.
    MatchPhrasePrefix {
        field: String,
        query: String,
        max_expansions: Option<u32>,
    },
    /// The same text against several fields.
    MultiMatch {
        fields: Vec<String>,
        query: String,
        kind: MultiMatchType,
        max_expansions: Option<u32>,
    },
    /// Term match tolerating character edits.
    Fuzzy {
        field: String,
        value: String,
        fuzziness: Option<Fuzziness>,
        transpositions: Option<bool>,
    },
    /// Pattern match with `*` and `?`.
    Wildcard { field: String, value: String },
    /// Term prefix match.
    Prefix { field: String, value: String },
    /// Lucene query-string syntax.
    QueryString {
        query: String,
        fields: Vec<String>,
        analyze_wildcard: bool,
    },
    /// Range on an ordered field.
    Range { field: String, bounds: RangeBounds },
    /// Documents where the field has a value.
    Exists { field: String },
    /// Boolean combination.
    Bool(BoolQuery),
    /// A Query DSL fragment passed through unchanged.
    Raw(Value),
}

/// Operator combining the terms of a `match` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    And,
    Or,
}

/// How a `multi_match` query scores across fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiMatchType {
    #[default]
    BestFields,
    MostFields,
    CrossFields,
    Phrase,
    PhrasePrefix,
    BoolPrefix,
}

impl MultiMatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiMatchType::BestFields => "best_fields",
            MultiMatchType::MostFields => "most_fields",
            MultiMatchType::CrossFields => "cross_fields",
            MultiMatchType::Phrase => "phrase",
            MultiMatchType::PhrasePrefix => "phrase_prefix",
            MultiMatchType::BoolPrefix => "bool_prefix",
        }
    }
}

/// Allowed edit distance for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
    /// Distance derived from term length by the engine.
    Auto,
    /// A fixed maximum number of edits.
    EditDistance(u8),
}

/// Bounds of a range query. Unset bounds are open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

/// A boolean query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub filter: Vec<Query>,
    pub must_not: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: impl Into<Query>) -> Self {
        self.must.push(query.into());
        self
    }

    pub fn should(mut self, query: impl Into<Query>) -> Self {
        self.should.push(query.into());
        self
    }

    pub fn filter(mut self, query: impl Into<Query>) -> Self {
        self.filter.push(query.into());
        self
    }

    pub fn must_not(mut self, query: impl Into<Query>) -> Self {
        self.must_not.push(query.into());
        self
    }

    pub fn minimum_should_match(mut self, minimum: u32) -> Self {
        self.minimum_should_match = Some(minimum);
        self
    }
}

impl From<BoolQuery> for Query {
    fn from(bool_query: BoolQuery) -> Self {
        Query::Bool(bool_query)
    }
}

impl Query {
    /// Exact value match.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Analyzed full-text match.
    pub fn match_text(field: impl Into<String>, query: impl Into<String>) -> Self {
        Query::Match {
            field: field.into(),
            query: query.into(),
            operator: None,
        }
    }

    /// Documents with the given ids.
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Documents where the field has a value.
    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    /// Documents matching every condition (non-scoring filter context).
    pub fn all<I>(conditions: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        Query::Bool(BoolQuery {
            filter: conditions.into_iter().map(|c| c.to_query()).collect(),
            ..Default::default()
        })
    }

    /// Documents matching at least one condition.
    pub fn any<I>(conditions: I) -> Self
    where
        I: IntoIterator<Item = Condition>,
    {
        Query::Bool(BoolQuery {
            should: conditions.into_iter().map(|c| c.to_query()).collect(),
            minimum_should_match: Some(1),
            ..Default::default()
        })
    }

    /// Translates the query to Query DSL JSON.
    pub fn to_dsl(&self) -> Value {
        query_builder::build_query(self)
    }
}

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Full-text match (analyzed).
    Matches,
    /// Term prefix.
    StartsWith,
    /// Any of the values in an array.
    In,
    /// The field has a value (the condition's value is ignored).
    Exists,
    /// The field has no value (the condition's value is ignored).
    Missing,
}

/// A single `field operator value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::NotEq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Lte, value)
    }

    pub fn matches(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(field, Operator::Matches, Value::String(text.into()))
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(field, Operator::StartsWith, Value::String(prefix.into()))
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            field,
            Operator::In,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Exists, Value::Null)
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, Operator::Missing, Value::Null)
    }

    /// Converts the condition to a query.
    pub fn to_query(&self) -> Query {
        let field = self.field.clone();
        let range = |bounds: RangeBounds| Query::Range {
            field: self.field.clone(),
            bounds,
        };

        match self.operator {
            Operator::Eq => Query::Term {
                field,
                value: self.value.clone(),
            },
            Operator::NotEq => Query::Bool(BoolQuery::new().must_not(Query::Term {
                field,
                value: self.value.clone(),
            })),
            Operator::Gt => range(RangeBounds {
                gt: Some(self.value.clone()),
                ..Default::default()
            }),
            Operator::Gte => range(RangeBounds {
                gte: Some(self.value.clone()),
                ..Default::default()
            }),
            Operator::Lt => range(RangeBounds {
                lt: Some(self.value.clone()),
                ..Default::default()
            }),
            Operator::Lte => range(RangeBounds {
                lte: Some(self.value.clone()),
                ..Default::default()
            }),
            Operator::Matches => Query::Match {
                field,
                query: value_text(&self.value),
                operator: Some(MatchOperator::And),
            },
            Operator::StartsWith => Query::Prefix {
                field,
                value: value_text(&self.value),
            },
            Operator::In => Query::Terms {
                field,
                values: match &self.value {
                    Value::Array(values) => values.clone(),
                    other => vec![other.clone()],
                },
            },
            Operator::Exists => Query::Exists { field },
            Operator::Missing => Query::Bool(BoolQuery::new().must_not(Query::Exists { field })),
        }
    }
}

impl From<Condition> for Query {
    fn from(condition: Condition) -> Self {
        condition.to_query()
    }
}

/// Renders a JSON value as query text (strings without quotes).
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_eq_is_term() {
        let query = Condition::eq("status", "active").to_query();
        assert_eq!(query, Query::term("status", "active"));
    }

    #[test]
    fn test_condition_range_operators() {
        let query = Condition::gte("price", 10).to_query();
        match query {
            Query::Range { field, bounds } => {
                assert_eq!(field, "price");
                assert_eq!(bounds.gte, Some(json!(10)));
                assert!(bounds.gt.is_none() && bounds.lt.is_none() && bounds.lte.is_none());
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_not_eq_and_missing_negate() {
        match Condition::not_eq("status", "deleted").to_query() {
            Query::Bool(b) => assert_eq!(b.must_not, vec![Query::term("status", "deleted")]),
            other => panic!("expected bool, got {:?}", other),
        }
        match Condition::missing("email").to_query() {
            Query::Bool(b) => assert_eq!(b.must_not, vec![Query::exists("email")]),
            other => panic!("expected bool, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_in_accepts_scalar() {
        let query = Condition::new("tag", Operator::In, "sale").to_query();
        assert_eq!(
            query,
            Query::Terms {
                field: "tag".to_string(),
                values: vec![json!("sale")]
            }
        );

        let query = Condition::is_in("tag", ["a", "b"]).to_query();
        assert_eq!(
            query,
            Query::Terms {
                field: "tag".to_string(),
                values: vec![json!("a"), json!("b")]
            }
        );
    }

    #[test]
    fn test_condition_text_operators_render_numbers() {
        let query = Condition::new("code", Operator::StartsWith, 12).to_query();
        assert_eq!(
            query,
            Query::Prefix {
                field: "code".to_string(),
                value: "12".to_string()
            }
        );
    }

    #[test]
    fn test_any_sets_minimum_should_match() {
        match Query::any([Condition::eq("a", 1), Condition::eq("b", 2)]) {
            Query::Bool(b) => {
                assert_eq!(b.should.len(), 2);
                assert_eq!(b.minimum_should_match, Some(1));
            }
            other => panic!("expected bool, got {:?}", other),
        }
    }
}
