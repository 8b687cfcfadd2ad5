//! Autocomplete request shapes.
//!
//! Each builder lower-cases the field name and the query text before
//! producing the request.

use crate::query::{BoolQuery, Fuzziness, MultiMatchType, Query, SearchRequest};

/// Maximum edits for [`FuzzyMode::EditDistance`]. Elasticsearch caps the
/// effective distance at 2.
pub const AUTOCOMPLETE_EDIT_DISTANCE: u8 = 4;

/// Page size of in-between wildcard completion.
pub const IN_BETWEEN_PAGE_SIZE: u64 = 10;

/// Term expansion limit of the phrase-prefix shapes.
pub const PREFIX_MAX_EXPANSIONS: u32 = 10;

/// How [`fuzzy`] tolerates typos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FuzzyMode {
    /// Fixed edit distance.
    #[default]
    EditDistance,
    /// Transposition-aware matching with the engine's default fuzziness.
    Transpositions,
}

/// Fuzzy term match on one field.
pub fn fuzzy(field: &str, query: &str, mode: FuzzyMode) -> SearchRequest {
    let (fuzziness, transpositions) = match mode {
        FuzzyMode::EditDistance => (Some(Fuzziness::EditDistance(AUTOCOMPLETE_EDIT_DISTANCE)), None),
        FuzzyMode::Transpositions => (None, Some(true)),
    };

    SearchRequest::new(Query::Fuzzy {
        field: field.to_lowercase(),
        value: query.to_lowercase(),
        fuzziness,
        transpositions,
    })
}

/// Trailing-wildcard completion, first page only.
pub fn wildcard_in_between(field: &str, query: &str) -> SearchRequest {
    let wildcard = Query::Wildcard {
        field: field.to_lowercase(),
        value: format!("{}*", query.to_lowercase()),
    };

    SearchRequest::new(BoolQuery::new().should(wildcard).into())
        .from(0)
        .size(IN_BETWEEN_PAGE_SIZE)
}

/// Phrase-prefix match on one field.
pub fn phrase_prefix(field: &str, query: &str) -> SearchRequest {
    SearchRequest::new(Query::MatchPhrasePrefix {
        field: field.to_lowercase(),
        query: query.to_lowercase(),
        max_expansions: Some(PREFIX_MAX_EXPANSIONS),
    })
}

/// Phrase-prefix match across several fields.
pub fn multi_field_phrase_prefix<S: AsRef<str>>(fields: &[S], query: &str) -> SearchRequest {
    SearchRequest::new(Query::MultiMatch {
        fields: fields.iter().map(|f| f.as_ref().to_lowercase()).collect(),
        query: query.to_lowercase(),
        kind: MultiMatchType::PhrasePrefix,
        max_expansions: Some(PREFIX_MAX_EXPANSIONS),
    })
}

/// Infix "like" match using query-string wildcards on both sides.
pub fn query_string_like(field: &str, query: &str) -> SearchRequest {
    SearchRequest::new(Query::QueryString {
        query: format!("*{}*", query.to_lowercase()),
        fields: vec![field.to_lowercase()],
        analyze_wildcard: true,
    })
}
