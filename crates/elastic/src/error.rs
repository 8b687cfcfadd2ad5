//! Error types for Elasticsearch operations.
//!
//! Every repository and service operation returns an [`ElasticResult`]. The
//! error kinds separate a legitimate "not found" from a transport failure,
//! a rejected request, and a write conflict, so callers can decide on their
//! own retry or surfacing policy.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type ElasticResult<T> = Result<T, ElasticError>;

/// The primary error type for all Elasticsearch operations.
#[derive(Error, Debug)]
pub enum ElasticError {
    /// The index or document does not exist.
    #[error("not found: {}", not_found_target(.index, .id))]
    NotFound { index: String, id: Option<String> },

    /// The write conflicted with the current state (version conflict,
    /// document or index already exists).
    #[error("conflict on {index}: {message}")]
    Conflict { index: String, message: String },

    /// The request was rejected as invalid, either locally or by the server.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The cluster could not be reached or the connection failed mid-request.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server answered with an unexpected non-success status.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// A bulk request completed but some items failed.
    #[error("bulk request failed for {} item(s)", .failed.len())]
    Bulk { failed: Vec<BulkItemFailure> },

    /// A document or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The client or service is misconfigured.
    #[error("configuration error: {message}")]
    Config { message: String },
}

fn not_found_target(index: &str, id: &Option<String>) -> String {
    match id {
        Some(id) => format!("{}/{}", index, id),
        None => index.to_string(),
    }
}

/// Errors for requests rejected as invalid.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The server rejected the request body (HTTP 400).
    #[error("invalid request on {index}: {message}")]
    InvalidRequest { index: String, message: String },

    /// A required argument was empty.
    #[error("missing required argument: {argument}")]
    MissingArgument { argument: String },

    /// A document could not provide a usable identifier.
    #[error("document has no identifier")]
    MissingDocumentId,
}

/// A single failed item of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// The document id, if the server reported one.
    pub id: Option<String>,
    /// The per-item HTTP status.
    pub status: u16,
    /// The failure reason reported by the server.
    pub reason: String,
}

impl fmt::Display for BulkItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (status {}): {}",
            self.id.as_deref().unwrap_or("<no id>"),
            self.status,
            self.reason
        )
    }
}

impl ElasticError {
    /// Creates a not-found error for an index.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        ElasticError::NotFound {
            index: index.into(),
            id: None,
        }
    }

    /// Creates a not-found error for a document.
    pub fn document_not_found(index: impl Into<String>, id: impl Into<String>) -> Self {
        ElasticError::NotFound {
            index: index.into(),
            id: Some(id.into()),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        ElasticError::Config {
            message: message.into(),
        }
    }

    /// Wraps a client-side transport failure.
    pub fn transport(error: elasticsearch::Error) -> Self {
        if let Some(status) = error.status_code() {
            return ElasticError::Server {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        ElasticError::Transport {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Classifies a non-success response.
    ///
    /// `body` is the raw response text; the server's `error.reason` is used
    /// as the message when present.
    pub fn from_status(status: u16, index: &str, id: Option<&str>, body: &str) -> Self {
        let message = error_reason(body);
        match status {
            404 => ElasticError::NotFound {
                index: index.to_string(),
                id: id.map(String::from),
            },
            409 => ElasticError::Conflict {
                index: index.to_string(),
                message,
            },
            400 if message.contains("resource_already_exists_exception") => {
                ElasticError::Conflict {
                    index: index.to_string(),
                    message,
                }
            }
            400 => ElasticError::Validation(ValidationError::InvalidRequest {
                index: index.to_string(),
                message,
            }),
            _ => ElasticError::Server { status, message },
        }
    }

    /// Returns true for the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ElasticError::NotFound { .. })
    }

    /// Returns true for the conflict kind.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ElasticError::Conflict { .. })
    }

    /// Returns true when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ElasticError::Transport { .. } => true,
            ElasticError::Server { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Extracts `error.type: error.reason` from an Elasticsearch error body,
/// falling back to the raw body text.
fn error_reason(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    match error {
        Some(Value::Object(obj)) => {
            let kind = obj.get("type").and_then(|t| t.as_str()).unwrap_or("error");
            let reason = obj.get("reason").and_then(|r| r.as_str()).unwrap_or("");
            format!("{}: {}", kind, reason)
        }
        Some(Value::String(s)) => s.clone(),
        _ if body.is_empty() => "no response body".to_string(),
        _ => body.to_string(),
    }
}
