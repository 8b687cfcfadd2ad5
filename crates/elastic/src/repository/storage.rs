//! `ElasticRepository` implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::{
    BulkOperation, BulkParts, CountParts, DeleteByQueryParts, DeleteParts, ExistsParts, GetParts,
    IndexParts, MgetParts, UpdateParts,
};
use serde_json::{Value, json};

use crate::client::{Media, ensure_success, read_json, transport_error};
use crate::document::Document;
use crate::error::{ElasticError, ElasticResult, ValidationError};
use crate::mapping::{IndexSettings, Mapping, create_index_body};
use crate::query::{Aggregations, GetRequest, Query, SearchRequest};
use crate::response::{
    CountResponse, DeleteByQueryResponse, GetResponse, MultiGetResponse, SearchResponse,
    bulk_failures,
};

use super::ElasticRepository;
use super::backend::ElasticsearchRepository;
use super::schema;

fn require_id(id: &str) -> ElasticResult<()> {
    if id.trim().is_empty() {
        return Err(ElasticError::Validation(ValidationError::MissingArgument {
            argument: "id".to_string(),
        }));
    }
    Ok(())
}

fn document_id<T: Document>(document: &T) -> ElasticResult<String> {
    let id = document.id();
    if id.trim().is_empty() {
        return Err(ElasticError::Validation(ValidationError::MissingDocumentId));
    }
    Ok(id)
}

impl<T: Document> ElasticsearchRepository<T> {
    /// Refreshes the repository's index so recent writes are searchable.
    pub async fn refresh(&self) -> ElasticResult<()> {
        self.client().refresh(self.index_name()).await
    }

    async fn update_document(&self, id: &str, patch: Value) -> ElasticResult<()> {
        let index = self.index_name();

        let mut request = self
            .client()
            .inner()
            .update(UpdateParts::IndexId(index, id))
            .body(json!({ "doc": patch }));
        if let Some(refresh) = self.refresh_policy().as_param() {
            request = request.refresh(refresh);
        }

        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("update", index))?;

        ensure_success(response, "update", index, Some(id)).await?;
        tracing::debug!(index, id, "Updated Elasticsearch document");
        Ok(())
    }
}

#[async_trait]
impl<T: Document> ElasticRepository<T> for ElasticsearchRepository<T> {
    async fn check_index_exists(&self, index: &str) -> ElasticResult<bool> {
        schema::require_index_name(index)?;
        self.client().index_exists(index).await
    }

    async fn get(&self, id: &str) -> ElasticResult<T> {
        self.get_with(&GetRequest::new(id)).await
    }

    async fn get_with(&self, request: &GetRequest) -> ElasticResult<T> {
        require_id(&request.id)?;
        let index = request.index.as_deref().unwrap_or(self.index_name());
        let id = request.id.as_str();

        let includes: Vec<&str> = request.source_includes.iter().map(String::as_str).collect();
        let excludes: Vec<&str> = request.source_excludes.iter().map(String::as_str).collect();

        let mut get = self.client().inner().get(GetParts::IndexId(index, id));
        if let Some(routing) = request.routing.as_deref() {
            get = get.routing(routing);
        }
        if let Some(preference) = request.preference.as_deref() {
            get = get.preference(preference);
        }
        if let Some(realtime) = request.realtime {
            get = get.realtime(realtime);
        }
        if !includes.is_empty() {
            get = get._source_includes(&includes);
        }
        if !excludes.is_empty() {
            get = get._source_excludes(&excludes);
        }

        let response = self
            .client()
            .versioned(get, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("get", index))?;
        let response = ensure_success(response, "get", index, Some(id)).await?;
        let body: GetResponse<T> = read_json(response).await?;

        match body.source {
            Some(source) if body.found => Ok(source),
            _ => Err(ElasticError::document_not_found(index, id)),
        }
    }

    async fn find(&self, id: &str) -> ElasticResult<Option<T>> {
        self.find_with(&GetRequest::new(id)).await
    }

    async fn find_with(&self, request: &GetRequest) -> ElasticResult<Option<T>> {
        match self.get_with(request).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_all(&self) -> ElasticResult<Vec<T>> {
        self.search_request(&SearchRequest::default()).await
    }

    async fn get_many(&self, ids: &[String]) -> ElasticResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index_name();
        let request = self
            .client()
            .inner()
            .mget(MgetParts::Index(index))
            .body(json!({ "ids": ids }));
        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("get_many", index))?;

        let response = ensure_success(response, "get_many", index, None).await?;
        let body: MultiGetResponse<T> = read_json(response).await?;
        Ok(body.into_found())
    }

    async fn search(&self, query: &Query) -> ElasticResult<Vec<T>> {
        self.search_request(&SearchRequest::new(query.clone())).await
    }

    async fn search_with_aggregations(
        &self,
        query: &Query,
        aggregations: &Aggregations,
    ) -> ElasticResult<SearchResponse<T>> {
        let request = SearchRequest::new(query.clone()).aggregations(aggregations.clone());
        self.client()
            .search_documents(self.index_name(), request.body())
            .await
    }

    async fn search_request(&self, request: &SearchRequest) -> ElasticResult<Vec<T>> {
        let index = request.index.as_deref().unwrap_or(self.index_name());
        let response: SearchResponse<T> =
            self.client().search_documents(index, request.body()).await?;
        Ok(response.into_documents())
    }

    async fn create_index(&self) -> ElasticResult<bool> {
        self.create_index_named(self.index_name()).await
    }

    async fn create_index_named(&self, index: &str) -> ElasticResult<bool> {
        schema::create_index(self.client(), index, create_index_body(&T::mapping(), None)).await
    }

    async fn create_index_with_mapping(
        &self,
        index: &str,
        mapping: &Mapping,
    ) -> ElasticResult<bool> {
        let settings = IndexSettings::mapped_default();
        schema::create_index(
            self.client(),
            index,
            create_index_body(mapping, Some(&settings)),
        )
        .await
    }

    async fn delete_index(&self, index: &str) -> ElasticResult<()> {
        schema::delete_index(self.client(), index).await
    }

    async fn insert(&self, document: &T) -> ElasticResult<()> {
        let index = self.index_name();
        let id = document.id();

        // Without an id the cluster assigns one.
        let parts = if id.is_empty() {
            IndexParts::Index(index)
        } else {
            IndexParts::IndexId(index, &id)
        };

        let mut request = self.client().inner().index(parts).body(document);
        if let Some(refresh) = self.refresh_policy().as_param() {
            request = request.refresh(refresh);
        }

        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("insert", index))?;

        ensure_success(response, "insert", index, Some(&id)).await?;
        tracing::debug!(index, id = %id, "Indexed Elasticsearch document");
        Ok(())
    }

    async fn insert_many(&self, documents: &[T]) -> ElasticResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.create_index().await?;

        let index = self.index_name();
        let operations: Vec<BulkOperation<&T>> = documents
            .iter()
            .map(|document| -> BulkOperation<&T> {
                let id = document.id();
                let operation = BulkOperation::index(document);
                if id.is_empty() {
                    operation.into()
                } else {
                    operation.id(id).into()
                }
            })
            .collect();

        let mut request = self
            .client()
            .inner()
            .bulk(BulkParts::Index(index))
            .body(operations);
        if let Some(refresh) = self.refresh_policy().as_param() {
            request = request.refresh(refresh);
        }

        let response = self
            .client()
            .versioned(request, Media::NdJson, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("insert_many", index))?;

        let response = ensure_success(response, "insert_many", index, None).await?;
        let body: Value = read_json(response).await?;

        let failed = bulk_failures(&body);
        if !failed.is_empty() {
            tracing::error!(
                index,
                failed = failed.len(),
                total = documents.len(),
                "Elasticsearch bulk insert had item failures"
            );
            return Err(ElasticError::Bulk { failed });
        }

        tracing::debug!(index, count = documents.len(), "Bulk indexed Elasticsearch documents");
        Ok(())
    }

    async fn update(&self, document: &T) -> ElasticResult<()> {
        let id = document_id(document)?;
        let patch = serde_json::to_value(document)?;
        self.update_document(&id, patch).await
    }

    async fn update_partial(&self, document: &T, patch: Value) -> ElasticResult<()> {
        let id = document_id(document)?;
        self.update_document(&id, patch).await
    }

    async fn delete_by_id(&self, id: &str) -> ElasticResult<()> {
        require_id(id)?;
        let index = self.index_name();

        let mut request = self.client().inner().delete(DeleteParts::IndexId(index, id));
        if let Some(refresh) = self.refresh_policy().as_param() {
            request = request.refresh(refresh);
        }

        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("delete_by_id", index))?;

        ensure_success(response, "delete_by_id", index, Some(id)).await?;
        tracing::debug!(index, id, "Deleted Elasticsearch document");
        Ok(())
    }

    async fn delete_by_query(&self, query: &Query) -> ElasticResult<u64> {
        let index = self.index_name();

        let targets: &[&str] = &[index];

        let mut request = self
            .client()
            .inner()
            .delete_by_query(DeleteByQueryParts::Index(targets))
            .body(json!({ "query": query.to_dsl() }));
        if self.refresh_policy().as_param().is_some() {
            request = request.refresh(true);
        }

        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("delete_by_query", index))?;

        let response = ensure_success(response, "delete_by_query", index, None).await?;
        let body: DeleteByQueryResponse = read_json(response).await?;
        tracing::debug!(index, deleted = body.deleted, "Deleted Elasticsearch documents by query");
        Ok(body.deleted)
    }

    async fn count(&self) -> ElasticResult<u64> {
        let index = self.index_name();
        let targets: &[&str] = &[index];
        let request = self
            .client()
            .inner()
            .count(CountParts::Index(targets))
            .body(json!({ "query": Query::MatchAll.to_dsl() }));
        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("count", index))?;

        let response = ensure_success(response, "count", index, None).await?;
        let body: CountResponse = read_json(response).await?;
        Ok(body.count)
    }

    async fn exists(&self, id: &str) -> ElasticResult<bool> {
        require_id(id)?;
        let index = self.index_name();

        let request = self.client().inner().exists(ExistsParts::IndexId(index, id));
        let response = self
            .client()
            .versioned(request, Media::Json, |r, k, v| r.header(k, v))
            .send()
            .await
            .map_err(transport_error("exists", index))?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => ensure_success(response, "exists", index, Some(id))
                .await
                .map(|_| false),
        }
    }
}
