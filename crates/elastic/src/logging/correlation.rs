//! Correlation ids for grouping the log records of one logical request.

use tracing::Span;
use uuid::Uuid;

/// Span or event field carrying the correlation id.
pub const CORRELATION_ID_FIELD: &str = "correlation_id";

/// Correlation id stored in span extensions by [`ElasticLogLayer`](super::ElasticLogLayer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CorrelationId(pub String);

/// Generates a fresh correlation id.
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Creates a span carrying a fresh correlation id. Events inside it are
/// shipped with that id.
///
/// ```ignore
/// let span = correlation_span();
/// async move { handle(request).await }.instrument(span).await;
/// ```
pub fn correlation_span() -> Span {
    correlation_span_with(&new_correlation_id())
}

/// Creates a span carrying the given correlation id, e.g. one received in
/// an inbound request header.
pub fn correlation_span_with(correlation_id: &str) -> Span {
    tracing::info_span!("request", correlation_id = %correlation_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_correlation_ids_are_unique() {
        let a = new_correlation_id();
        let b = new_correlation_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
