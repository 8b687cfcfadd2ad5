//! Elasticsearch repository handle.

use std::fmt::Debug;
use std::marker::PhantomData;

use elasticsearch::params::Refresh;

use crate::client::ElasticClient;
use crate::document::Document;

/// When writes become visible to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Visible after the next periodic refresh.
    #[default]
    None,
    /// Refresh the affected shards immediately.
    Immediate,
    /// Wait for the next refresh before returning.
    WaitFor,
}

impl RefreshPolicy {
    pub(crate) fn as_param(&self) -> Option<Refresh> {
        match self {
            RefreshPolicy::None => None,
            RefreshPolicy::Immediate => Some(Refresh::True),
            RefreshPolicy::WaitFor => Some(Refresh::WaitFor),
        }
    }
}

/// Repository for documents of type `T` stored in a single index.
///
/// Holds a clone of the shared client; cloning the repository is cheap.
pub struct ElasticsearchRepository<T> {
    client: ElasticClient,
    index: String,
    refresh: RefreshPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ElasticsearchRepository<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            index: self.index.clone(),
            refresh: self.refresh,
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for ElasticsearchRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchRepository")
            .field("index", &self.index)
            .field("refresh", &self.refresh)
            .field("client", &self.client)
            .finish()
    }
}

impl<T: Document> ElasticsearchRepository<T> {
    /// Creates a repository bound to the type's own index.
    pub fn new(client: ElasticClient) -> Self {
        Self::with_index(client, T::index_name())
    }
}

impl<T> ElasticsearchRepository<T> {
    /// Creates a repository bound to an explicit index.
    pub fn with_index(client: ElasticClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
            refresh: RefreshPolicy::default(),
            _marker: PhantomData,
        }
    }

    /// Sets the refresh policy applied to writes.
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Returns the index this repository reads and writes.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Returns the refresh policy applied to writes.
    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh
    }

    /// Returns the client handle.
    pub fn client(&self) -> &ElasticClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElasticConfiguration;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Product {
        id: String,
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
    fn test_index_name_from_type() {
        let repo = ElasticsearchRepository::<Product>::new(client());
        assert_eq!(repo.index_name(), "product");
        assert_eq!(repo.refresh_policy(), RefreshPolicy::None);
    }

    #[test]
    fn test_explicit_index_and_refresh() {
        let repo = ElasticsearchRepository::<Product>::with_index(client(), "products-v2")
            .with_refresh(RefreshPolicy::WaitFor);
        let cloned = repo.clone();
        assert_eq!(cloned.index_name(), "products-v2");
        assert_eq!(cloned.refresh_policy(), RefreshPolicy::WaitFor);
    }

    #[test]
    fn test_refresh_param_mapping() {
        assert!(RefreshPolicy::None.as_param().is_none());
        assert!(matches!(RefreshPolicy::Immediate.as_param(), Some(Refresh::True)));
        assert!(matches!(RefreshPolicy::WaitFor.as_param(), Some(Refresh::WaitFor)));
    }
}
