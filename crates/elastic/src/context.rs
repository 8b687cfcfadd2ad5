//! Application root.
//!
//! [`ElasticContext`] is built once at startup. It owns the configuration
//! and the shared client handle and hands out repositories and services
//! that reuse that handle.

use crate::client::ElasticClient;
use crate::config::ElasticConfiguration;
use crate::document::Document;
use crate::error::{ElasticError, ElasticResult};
use crate::repository::ElasticsearchRepository;
use crate::service::ElasticsearchService;

/// Owns the shared client and produces per-type handles.
#[derive(Debug, Clone)]
pub struct ElasticContext {
    config: ElasticConfiguration,
    client: ElasticClient,
}

impl ElasticContext {
    /// Validates the configuration and builds the shared client.
    pub fn new(config: ElasticConfiguration) -> ElasticResult<Self> {
        if let Err(errors) = config.validate() {
            return Err(ElasticError::config(errors.join("; ")));
        }

        let client = ElasticClient::new(&config)?;
        tracing::info!(
            url = %config.url,
            default_index = ?config.default_index(),
            authenticated = config.has_credentials(),
            "Elasticsearch context initialized"
        );

        Ok(Self { config, client })
    }

    /// Builds a context from a configure callback applied to defaults.
    pub fn configure<F>(configure: F) -> ElasticResult<Self>
    where
        F: FnOnce(&mut ElasticConfiguration),
    {
        Self::new(ElasticConfiguration::configure(configure))
    }

    pub fn config(&self) -> &ElasticConfiguration {
        &self.config
    }

    /// Returns the shared client handle.
    pub fn client(&self) -> &ElasticClient {
        &self.client
    }

    /// Returns a repository for `T` bound to its own index.
    pub fn repository<T: Document>(&self) -> ElasticsearchRepository<T> {
        ElasticsearchRepository::new(self.client.clone())
    }

    /// Returns an autocomplete service for `T` with no secondary client.
    pub fn service<T: Document>(&self) -> ElasticsearchService<T> {
        ElasticsearchService::new(self.client.clone())
    }
}
