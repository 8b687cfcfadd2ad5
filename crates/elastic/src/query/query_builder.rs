//! Elasticsearch Query DSL builder.
//!
//! Translates the typed [`Query`] model into Query DSL JSON.

use serde_json::{Map, Value, json};

use super::{BoolQuery, Fuzziness, MatchOperator, Query, RangeBounds};

/// Builds the Query DSL object for a query.
pub fn build_query(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::MatchNone => json!({ "match_none": {} }),
        Query::Term { field, value } => json!({
            "term": { field: { "value": value } }
        }),
        Query::Terms { field, values } => json!({
            "terms": { field: values }
        }),
        Query::Ids(ids) => json!({
            "ids": { "values": ids }
        }),
        Query::Match {
            field,
            query,
            operator,
        } => {
            let mut clause = json!({ "query": query });
            if let Some(op) = operator {
                clause["operator"] = json!(match op {
                    MatchOperator::And => "and",
                    MatchOperator::Or => "or",
                });
            }
            json!({ "match": { field: clause } })
        }
        Query::MatchPhrasePrefix {
            field,
            query,
            max_expansions,
        } => {
            let mut clause = json!({ "query": query });
            if let Some(max) = max_expansions {
                clause["max_expansions"] = json!(max);
            }
            json!({ "match_phrase_prefix": { field: clause } })
        }
        Query::MultiMatch {
            fields,
            query,
            kind,
            max_expansions,
        } => {
            let mut clause = json!({
                "query": query,
                "fields": fields,
                "type": kind.as_str(),
            });
            if let Some(max) = max_expansions {
                clause["max_expansions"] = json!(max);
            }
            json!({ "multi_match": clause })
        }
        Query::Fuzzy {
            field,
            value,
            fuzziness,
            transpositions,
        } => {
            let mut clause = json!({ "value": value });
            if let Some(fuzziness) = fuzziness {
                clause["fuzziness"] = fuzziness_value(*fuzziness);
            }
            if let Some(transpositions) = transpositions {
                clause["transpositions"] = json!(transpositions);
            }
            json!({ "fuzzy": { field: clause } })
        }
        Query::Wildcard { field, value } => json!({
            "wildcard": { field: { "value": value } }
        }),
        Query::Prefix { field, value } => json!({
            "prefix": { field: { "value": value } }
        }),
        Query::QueryString {
            query,
            fields,
            analyze_wildcard,
        } => {
            let mut clause = json!({ "query": query });
            if !fields.is_empty() {
                clause["fields"] = json!(fields);
            }
            if *analyze_wildcard {
                clause["analyze_wildcard"] = json!(true);
            }
            json!({ "query_string": clause })
        }
        Query::Range { field, bounds } => json!({
            "range": { field: build_range(bounds) }
        }),
        Query::Exists { field } => json!({
            "exists": { "field": field }
        }),
        Query::Bool(bool_query) => build_bool(bool_query),
        Query::Raw(value) => value.clone(),
    }
}

fn fuzziness_value(fuzziness: Fuzziness) -> Value {
    match fuzziness {
        Fuzziness::Auto => json!("AUTO"),
        Fuzziness::EditDistance(n) => json!(n),
    }
}

fn build_range(bounds: &RangeBounds) -> Value {
    let mut range = Map::new();
    for (key, bound) in [
        ("gt", &bounds.gt),
        ("gte", &bounds.gte),
        ("lt", &bounds.lt),
        ("lte", &bounds.lte),
    ] {
        if let Some(value) = bound {
            range.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(range)
}

fn build_bool(bool_query: &BoolQuery) -> Value {
    let mut clauses = Map::new();

    for (key, queries) in [
        ("must", &bool_query.must),
        ("should", &bool_query.should),
        ("filter", &bool_query.filter),
        ("must_not", &bool_query.must_not),
    ] {
        if !queries.is_empty() {
            clauses.insert(
                key.to_string(),
                Value::Array(queries.iter().map(build_query).collect()),
            );
        }
    }

    if let Some(minimum) = bool_query.minimum_should_match {
        clauses.insert("minimum_should_match".to_string(), json!(minimum));
    }

    json!({ "bool": clauses })
}
