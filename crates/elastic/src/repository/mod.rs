//! Generic document repository.
//!
//! [`ElasticRepository`] is the CRUD + search contract for one model type;
//! [`ElasticsearchRepository`] implements it against a single index
//! (by default the type's [`Document::index_name`]).
//!
//! Every operation is one request/response round trip. Failures are logged
//! and returned as typed [`ElasticError`](crate::ElasticError)s; "not found"
//! is distinguishable from transport and validation failures.
//!
//! # Example
//!
//! ```ignore
//! use helios_elastic::{ElasticClient, ElasticConfiguration, ElasticRepository};
//! use helios_elastic::repository::ElasticsearchRepository;
//!
//! let client = ElasticClient::new(&ElasticConfiguration::new("http://localhost:9200"))?;
//! let products = ElasticsearchRepository::<Product>::new(client);
//! products.insert(&product).await?;
//! let found = products.find("sku-1").await?;
//! ```

mod backend;
mod schema;
mod storage;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::Document;
use crate::error::ElasticResult;
use crate::mapping::Mapping;
use crate::query::{Aggregations, GetRequest, Query, SearchRequest};
use crate::response::SearchResponse;

pub use backend::{ElasticsearchRepository, RefreshPolicy};

/// CRUD and search operations over the index of one document type.
#[async_trait]
pub trait ElasticRepository<T: Document>: Send + Sync {
    /// Returns true if the named index exists.
    async fn check_index_exists(&self, index: &str) -> ElasticResult<bool>;

    /// Fetches a document by id. A missing document is an error.
    async fn get(&self, id: &str) -> ElasticResult<T>;

    /// Fetches a document using a caller-shaped request. A missing document
    /// is an error.
    async fn get_with(&self, request: &GetRequest) -> ElasticResult<T>;

    /// Fetches a document by id, returning `None` if it does not exist.
    async fn find(&self, id: &str) -> ElasticResult<Option<T>>;

    /// Fetches a document using a caller-shaped request, returning `None`
    /// if it does not exist.
    async fn find_with(&self, request: &GetRequest) -> ElasticResult<Option<T>>;

    /// Returns all documents matched by a match-all query. No paging is
    /// applied, so the engine's default page size bounds the result.
    async fn get_all(&self) -> ElasticResult<Vec<T>>;

    /// Fetches several documents by id. Missing ids are skipped.
    async fn get_many(&self, ids: &[String]) -> ElasticResult<Vec<T>>;

    /// Runs a query against the index and returns the matching documents.
    async fn search(&self, query: &Query) -> ElasticResult<Vec<T>>;

    /// Runs a query with aggregations and returns the full response.
    async fn search_with_aggregations(
        &self,
        query: &Query,
        aggregations: &Aggregations,
    ) -> ElasticResult<SearchResponse<T>>;

    /// Runs a fully caller-controlled search request.
    async fn search_request(&self, request: &SearchRequest) -> ElasticResult<Vec<T>>;

    /// Creates the repository's index with the type's mapping. Returns
    /// `false` if the index already existed.
    async fn create_index(&self) -> ElasticResult<bool>;

    /// Creates a named index with the type's mapping. Returns `false` if the
    /// index already existed.
    async fn create_index_named(&self, index: &str) -> ElasticResult<bool>;

    /// Creates a named index with an explicit mapping and fixed shard and
    /// replica counts. Returns `false`, without changing anything, if the
    /// index already exists.
    async fn create_index_with_mapping(&self, index: &str, mapping: &Mapping)
    -> ElasticResult<bool>;

    /// Deletes a named index.
    async fn delete_index(&self, index: &str) -> ElasticResult<()>;

    /// Indexes a document under its id.
    async fn insert(&self, document: &T) -> ElasticResult<()>;

    /// Ensures the index exists, then bulk-indexes the documents.
    async fn insert_many(&self, documents: &[T]) -> ElasticResult<()>;

    /// Partially updates a document, using the whole document as the patch.
    async fn update(&self, document: &T) -> ElasticResult<()>;

    /// Partially updates a document with an explicit patch payload.
    async fn update_partial(&self, document: &T, patch: Value) -> ElasticResult<()>;

    /// Deletes a document by id.
    async fn delete_by_id(&self, id: &str) -> ElasticResult<()>;

    /// Deletes all documents matching the query and returns how many were
    /// deleted.
    async fn delete_by_query(&self, query: &Query) -> ElasticResult<u64>;

    /// Counts all documents in the index.
    async fn count(&self) -> ElasticResult<u64>;

    /// Returns true if a document with the id exists.
    async fn exists(&self, id: &str) -> ElasticResult<bool>;
}
