//! Index lifecycle helpers.

use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts};
use serde_json::Value;

use crate::client::{ElasticClient, Media, ensure_success, transport_error};
use crate::error::{ElasticError, ElasticResult, ValidationError};

/// Creates an index with the given body unless it already exists.
///
/// Returns `false` when the index was already present, including when
/// another writer creates it between the existence check and the create.
pub(crate) async fn create_index(
    client: &ElasticClient,
    index: &str,
    body: Value,
) -> ElasticResult<bool> {
    require_index_name(index)?;

    if client.index_exists(index).await? {
        tracing::debug!(index, "Elasticsearch index already exists");
        return Ok(false);
    }

    let indices = client.inner().indices();
    let request = indices.create(IndicesCreateParts::Index(index)).body(body);
    let response = client
        .versioned(request, Media::Json, |r, k, v| r.header(k, v))
        .send()
        .await
        .map_err(transport_error("create_index", index))?;

    match ensure_success(response, "create_index", index, None).await {
        Ok(_) => {
            tracing::info!(index, "Created Elasticsearch index");
            Ok(true)
        }
        Err(e) if e.is_conflict() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Deletes an index. A missing index is reported as not found.
pub(crate) async fn delete_index(client: &ElasticClient, index: &str) -> ElasticResult<()> {
    require_index_name(index)?;

    let targets: &[&str] = &[index];
    let indices = client.inner().indices();
    let request = indices.delete(IndicesDeleteParts::Index(targets));
    let response = client
        .versioned(request, Media::Json, |r, k, v| r.header(k, v))
        .send()
        .await
        .map_err(transport_error("delete_index", index))?;

    ensure_success(response, "delete_index", index, None).await?;
    tracing::info!(index, "Deleted Elasticsearch index");
    Ok(())
}

/// Rejects empty index names before any request is sent.
pub(crate) fn require_index_name(index: &str) -> ElasticResult<()> {
    if index.trim().is_empty() {
        return Err(ElasticError::Validation(ValidationError::MissingArgument {
            argument: "index".to_string(),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_index_name() {
        assert!(require_index_name("product").is_ok());
        let err = require_index_name("  ").unwrap_err();
        assert!(matches!(
            err,
            ElasticError::Validation(ValidationError::MissingArgument { ref argument }) if argument == "index"
        ));
    }
}
