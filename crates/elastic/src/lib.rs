//! Helios Elastic
//!
//! This crate wires an Elasticsearch client into an application and exposes
//! a typed repository, an autocomplete service and structured log shipping
//! to the same cluster.
//!
//! # Features
//!
//! - **Generic repository**: CRUD, multi-get, bulk insert, delete-by-query
//!   and search over one index per model type
//! - **Typed queries**: a query-expression model translated to Query DSL at
//!   the boundary, with aggregations, sorting and source filtering
//! - **Autocomplete**: fuzzy, wildcard, phrase-prefix, multi-field and
//!   query-string completion shapes
//! - **Typed errors**: not found, conflict, validation and transport
//!   failures are distinct [`ElasticError`] kinds
//! - **Log shipping**: a `tracing` layer that batches ECS-style records into
//!   the cluster
//!
//! # Architecture
//!
//! - [`config`] - Cluster configuration from code, serde or CLI/env
//! - [`client`] - Client factory and shared request plumbing
//! - [`document`] - The [`Document`] trait and index naming
//! - [`mapping`] - Index mappings and settings
//! - [`query`] - Query, aggregation and request builders
//! - [`response`] - Search response parsing
//! - [`repository`] - The generic [`ElasticRepository`]
//! - [`service`] - The autocomplete [`SearchService`]
//! - [`context`] - Application root handing out repositories and services
//! - [`logging`] - Subscriber setup and log shipping
//!
//! # Quick Start
//!
//! ```no_run
//! use helios_elastic::{Document, ElasticContext, ElasticRepository};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Product {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Document for Product {
//!     fn id(&self) -> String {
//!         self.id.clone()
//!     }
//! }
//!
//! # async fn run() -> helios_elastic::ElasticResult<()> {
//! let context = ElasticContext::configure(|config| {
//!     config.url = "http://localhost:9200".to_string();
//!     config.application_name = Some("catalog-api".to_string());
//! })?;
//!
//! let products = context.repository::<Product>();
//! products.insert(&Product { id: "sku-1".into(), name: "Phone".into() }).await?;
//! let found = products.find("sku-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod query;
pub mod repository;
pub mod response;
pub mod service;

#[cfg(test)]
mod test_support;

pub use client::ElasticClient;
pub use config::{ElasticArgs, ElasticConfiguration};
pub use context::ElasticContext;
pub use document::{Document, JsonDocument};
pub use error::{BulkItemFailure, ElasticError, ElasticResult, ValidationError};
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use mapping::{Mapping, Property};
pub use query::{Condition, Query, SearchRequest};
pub use repository::{ElasticRepository, ElasticsearchRepository, RefreshPolicy};
pub use response::SearchResponse;
pub use service::{ConnectionTarget, ElasticsearchService, FuzzyMode, SearchService};
