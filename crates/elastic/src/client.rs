//! Client factory and shared request plumbing.
//!
//! [`ElasticClient`] wraps the `elasticsearch` client together with the
//! default index from its configuration. It is cheap to clone and safe to
//! share between tasks; repositories and services each hold a clone.

use std::fmt::Debug;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::cluster::ClusterHealthParts;
use elasticsearch::http::headers::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesExistsParts, IndicesRefreshParts};
use elasticsearch::SearchParts;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ElasticConfiguration;
use crate::error::{ElasticError, ElasticResult};
use crate::response::SearchResponse;

const COMPATIBLE_JSON: &str = "application/vnd.elasticsearch+json; compatible-with=8";
const COMPATIBLE_NDJSON: &str = "application/vnd.elasticsearch+x-ndjson; compatible-with=8";

/// Encoding of a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Media {
    Json,
    /// Newline-delimited JSON (`_bulk`).
    NdJson,
}

/// A configured, cloneable handle to an Elasticsearch cluster.
#[derive(Clone)]
pub struct ElasticClient {
    inner: Elasticsearch,
    url: String,
    default_index: Option<String>,
    api_versioning: bool,
}

impl Debug for ElasticClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticClient")
            .field("url", &self.url)
            .field("default_index", &self.default_index)
            .finish_non_exhaustive()
    }
}

impl ElasticClient {
    /// Builds a client from configuration.
    ///
    /// No request is sent; a malformed URL fails here.
    pub fn new(config: &ElasticConfiguration) -> ElasticResult<Self> {
        let parsed_url: elasticsearch::http::Url = config.url.parse().map_err(|e| {
            ElasticError::config(format!("Invalid Elasticsearch URL '{}': {}", config.url, e))
        })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool);

        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some((username, password)) = config.credentials() {
            builder = builder.auth(Credentials::Basic(
                username.to_string(),
                password.to_string(),
            ));
        }

        let transport = builder
            .build()
            .map_err(|e| ElasticError::config(format!("Failed to build transport: {}", e)))?;

        tracing::debug!(url = %config.url, default_index = ?config.default_index(), "Elasticsearch client configured");

        Ok(Self {
            inner: Elasticsearch::new(transport),
            url: config.url.clone(),
            default_index: config.default_index().map(String::from),
            api_versioning: config.api_versioning,
        })
    }

    /// Returns true if requests carry the API compatibility media types.
    pub fn api_versioning(&self) -> bool {
        self.api_versioning
    }

    /// Sets the API compatibility `Accept` and `Content-Type` headers on a
    /// request builder.
    ///
    /// The transport writes `application/json` on every request and only
    /// per-request headers replace it, so each builder goes through here.
    pub(crate) fn versioned<R>(
        &self,
        request: R,
        media: Media,
        header: impl Fn(R, HeaderName, HeaderValue) -> R,
    ) -> R {
        if !self.api_versioning {
            return request;
        }
        let content_type = match media {
            Media::Json => COMPATIBLE_JSON,
            Media::NdJson => COMPATIBLE_NDJSON,
        };
        let request = header(request, ACCEPT, HeaderValue::from_static(COMPATIBLE_JSON));
        header(request, CONTENT_TYPE, HeaderValue::from_static(content_type))
    }

    /// Returns a copy of this client with a different default index.
    pub fn with_default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = Some(index.into());
        self
    }

    /// Returns the underlying `elasticsearch` client for requests this
    /// crate does not wrap.
    pub fn inner(&self) -> &Elasticsearch {
        &self.inner
    }

    /// Returns the cluster URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the default index, if configured.
    pub fn default_index(&self) -> Option<&str> {
        self.default_index.as_deref()
    }

    /// Pings the cluster.
    ///
    /// Returns `Ok(false)` when the cluster answers with a non-success status
    /// and an error when it cannot be reached.
    pub async fn ping(&self) -> ElasticResult<bool> {
        let response = self
            .versioned(self.inner.ping(), Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("ping", &self.url))?;

        let status = response.status_code();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = %status, "Elasticsearch ping failed");
        }
        Ok(status.is_success())
    }

    /// Returns the cluster health document.
    pub async fn cluster_health(&self) -> ElasticResult<Value> {
        let cluster = self.inner.cluster();
        let request = cluster.health(ClusterHealthParts::None);
        let response = self
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("cluster_health", &self.url))?;

        let response = ensure_success(response, "cluster_health", "_cluster", None).await?;
        read_json(response).await
    }

    /// Returns true if the index exists.
    pub async fn index_exists(&self, index: &str) -> ElasticResult<bool> {
        let targets: &[&str] = &[index];
        let indices = self.inner.indices();
        let request = indices.exists(IndicesExistsParts::Index(targets));
        let response = self
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("index_exists", index))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => ensure_success(response, "index_exists", index, None)
                .await
                .map(|_| false),
        }
    }

    /// Refreshes an index to make recently indexed documents searchable.
    pub async fn refresh(&self, index: &str) -> ElasticResult<()> {
        let targets: &[&str] = &[index];
        let indices = self.inner.indices();
        let request = indices.refresh(IndicesRefreshParts::Index(targets));
        let response = self
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("refresh", index))?;

        ensure_success(response, "refresh", index, None).await?;
        Ok(())
    }

    /// Executes a search and parses the hits into `T`.
    pub(crate) async fn search_documents<T: DeserializeOwned>(
        &self,
        index: &str,
        body: Value,
    ) -> ElasticResult<SearchResponse<T>> {
        tracing::debug!(index, body = %body, "Executing Elasticsearch search");

        let targets: &[&str] = &[index];
        let request = self.inner.search(SearchParts::Index(targets)).body(body);
        let response = self
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("search", index))?;

        let response = ensure_success(response, "search", index, None).await?;
        let body: Value = read_json(response).await?;
        Ok(SearchResponse::from_body(body)?)
    }
}

/// Passes successful responses through and classifies failures.
pub(crate) async fn ensure_success(
    response: Response,
    operation: &'static str,
    index: &str,
    id: Option<&str>,
) -> ElasticResult<Response> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let error = ElasticError::from_status(status.as_u16(), index, id, &body);
    log_failure(operation, index, &error);
    Err(error)
}

/// Maps a client-side failure to a transport error, logging it.
pub(crate) fn transport_error<'a>(
    operation: &'static str,
    index: &'a str,
) -> impl FnOnce(elasticsearch::Error) -> ElasticError + 'a {
    move |e| {
        let error = ElasticError::transport(e);
        log_failure(operation, index, &error);
        error
    }
}

/// Logs a failed operation. Not-found results are expected often and stay at debug.
pub(crate) fn log_failure(operation: &str, index: &str, error: &ElasticError) {
    if error.is_not_found() {
        tracing::debug!(operation, index, error = %error, "Elasticsearch target not found");
    } else {
        tracing::error!(operation, index, error = %error, "Elasticsearch request failed");
    }
}

/// Reads a response body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ElasticResult<T> {
    let text = response.text().await.map_err(ElasticError::transport)?;
    Ok(serde_json::from_str(&text)?)
}
