//! Search and autocomplete service.
//!
//! [`ElasticsearchService`] runs five canned typo-tolerant and prefix query
//! shapes against the index of `T` and reports cluster reachability. It
//! holds the primary client and, when explicitly supplied, a secondary one.

pub mod autocomplete;

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::client::ElasticClient;
use crate::config::ElasticConfiguration;
use crate::document::Document;
use crate::error::{ElasticError, ElasticResult, ValidationError};
use crate::query::SearchRequest;
use crate::response::SearchResponse;

pub use autocomplete::FuzzyMode;

/// Which client handle to ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionTarget {
    #[default]
    Primary,
    Secondary,
}

/// Autocomplete operations over the index of one document type.
#[async_trait]
pub trait SearchService<T: Document>: Send + Sync {
    /// Fuzzy term match tolerating typos.
    async fn auto_complete(&self, field: &str, query: &str, mode: FuzzyMode)
    -> ElasticResult<Vec<T>>;

    /// Trailing-wildcard completion, first ten hits.
    async fn auto_complete_in_between(&self, field: &str, query: &str) -> ElasticResult<Vec<T>>;

    /// Phrase-prefix match.
    async fn auto_match_in_between(&self, field: &str, query: &str) -> ElasticResult<Vec<T>>;

    /// Phrase-prefix match over several fields.
    async fn auto_match_without_sensitive(
        &self,
        fields: &[String],
        query: &str,
    ) -> ElasticResult<Vec<T>>;

    /// Infix match via query-string wildcards.
    async fn auto_analyze_with_like(&self, field: &str, query: &str) -> ElasticResult<Vec<T>>;

    /// Pings the primary or secondary cluster.
    async fn is_connected(&self, target: ConnectionTarget) -> ElasticResult<bool>;
}

/// Autocomplete service backed by Elasticsearch.
pub struct ElasticsearchService<T> {
    primary: ElasticClient,
    secondary: Option<ElasticClient>,
    index: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ElasticsearchService<T> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            index: self.index.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for ElasticsearchService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchService")
            .field("index", &self.index)
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .finish()
    }
}

impl<T: Document> ElasticsearchService<T> {
    /// Creates a service over the type's own index with no secondary client.
    pub fn new(primary: ElasticClient) -> Self {
        Self {
            primary,
            secondary: None,
            index: T::index_name(),
            _marker: PhantomData,
        }
    }

    /// Builds a fresh client whose default index is the type's index.
    pub fn get_connection(config: &ElasticConfiguration) -> ElasticResult<ElasticClient> {
        Ok(ElasticClient::new(config)?.with_default_index(T::index_name()))
    }
}

impl<T> ElasticsearchService<T> {
    /// Attaches a secondary client for [`ConnectionTarget::Secondary`].
    pub fn with_secondary(mut self, secondary: ElasticClient) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Targets an explicit index instead of the type's.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }
}

impl<T: Document> ElasticsearchService<T> {
    async fn run(&self, operation: &'static str, request: SearchRequest) -> ElasticResult<Vec<T>> {
        let response: SearchResponse<T> = self
            .primary
            .search_documents(&self.index, request.body())
            .await?;

        tracing::debug!(
            operation,
            index = %self.index,
            hits = response.hits.len(),
            "Autocomplete query completed"
        );
        Ok(response.into_documents())
    }
}

fn require_field(field: &str) -> ElasticResult<()> {
    if field.trim().is_empty() {
        return Err(ElasticError::Validation(ValidationError::MissingArgument {
            argument: "field".to_string(),
        }));
    }
    Ok(())
}

#[async_trait]
impl<T: Document> SearchService<T> for ElasticsearchService<T> {
    async fn auto_complete(
        &self,
        field: &str,
        query: &str,
        mode: FuzzyMode,
    ) -> ElasticResult<Vec<T>> {
        require_field(field)?;
        self.run("auto_complete", autocomplete::fuzzy(field, query, mode))
            .await
    }

    async fn auto_complete_in_between(&self, field: &str, query: &str) -> ElasticResult<Vec<T>> {
        require_field(field)?;
        self.run(
            "auto_complete_in_between",
            autocomplete::wildcard_in_between(field, query),
        )
        .await
    }

    async fn auto_match_in_between(&self, field: &str, query: &str) -> ElasticResult<Vec<T>> {
        require_field(field)?;
        self.run(
            "auto_match_in_between",
            autocomplete::phrase_prefix(field, query),
        )
        .await
    }

    async fn auto_match_without_sensitive(
        &self,
        fields: &[String],
        query: &str,
    ) -> ElasticResult<Vec<T>> {
        if fields.is_empty() {
            return Err(ElasticError::Validation(ValidationError::MissingArgument {
                argument: "fields".to_string(),
            }));
        }
        for field in fields {
            require_field(field)?;
        }
        self.run(
            "auto_match_without_sensitive",
            autocomplete::multi_field_phrase_prefix(fields, query),
        )
        .await
    }

    async fn auto_analyze_with_like(&self, field: &str, query: &str) -> ElasticResult<Vec<T>> {
        require_field(field)?;
        self.run(
            "auto_analyze_with_like",
            autocomplete::query_string_like(field, query),
        )
        .await
    }

    async fn is_connected(&self, target: ConnectionTarget) -> ElasticResult<bool> {
        let client = match target {
            ConnectionTarget::Primary => &self.primary,
            ConnectionTarget::Secondary => self.secondary.as_ref().ok_or_else(|| {
                ElasticError::config("No secondary Elasticsearch client configured")
            })?,
        };
        client.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Product {
        id: String,
        name: String,
    }

    impl Document for Product {
        fn id(&self) -> String {
            self.id.clone()
        }
    }

    fn client() -> ElasticClient {
        ElasticClient::new(&ElasticConfiguration::default()).unwrap()
    }

    #[test]
    fn test_service_targets_type_index() {
        let service = ElasticsearchService::<Product>::new(client());
        assert_eq!(service.index_name(), "product");
        assert!(!service.has_secondary());

        let service = service.with_index("catalog").with_secondary(client());
        assert_eq!(service.index_name(), "catalog");
        assert!(service.has_secondary());
    }

    #[test]
    fn test_get_connection_uses_type_index() {
        let config = ElasticConfiguration::new("http://search.internal:9200");
        let connection = ElasticsearchService::<Product>::get_connection(&config).unwrap();
        assert_eq!(connection.default_index(), Some("product"));
        assert_eq!(connection.url(), "http://search.internal:9200");

        let bad = ElasticConfiguration::new("::bad::");
        assert!(ElasticsearchService::<Product>::get_connection(&bad).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_secondary_is_config_error() {
        let service = ElasticsearchService::<Product>::new(client());
        let err = service
            .is_connected(ConnectionTarget::Secondary)
            .await
            .unwrap_err();
        assert!(matches!(err, ElasticError::Config { .. }));
    }

    #[tokio::test]
    async fn test_empty_field_rejected_before_request() {
        let service = ElasticsearchService::<Product>::new(client());
        let err = service
            .auto_complete("", "phone", FuzzyMode::EditDistance)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ElasticError::Validation(ValidationError::MissingArgument { .. })
        ));

        let err = service
            .auto_match_without_sensitive(&[], "phone")
            .await
            .unwrap_err();
        assert!(matches!(err, ElasticError::Validation(_)));
    }
}
