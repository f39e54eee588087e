//! Error types for the search layer.
//!
//! Errors are grouped by the kind of failure so callers can tell a caller
//! defect (validation, mapping) from a missing index (resolution, not found)
//! and from an engine failure (backend). A missing *document* is never an
//! error: lookups return `Option`.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for all index, document and search operations.
#[derive(Error, Debug)]
pub enum SearchIndexError {
    /// Malformed input detected before any engine call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The alias could not be resolved to a physical index.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The index behind the alias does not exist (e.g. after deletion).
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Stored attributes could not be mapped onto the requested type.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// The search engine rejected or could not serve the request.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors raised for malformed caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The document or object carries no usable identifier.
    #[error("missing document identifier: field '{field}' is absent or empty")]
    MissingId { field: String },

    /// A document identifier has a type that cannot be used as an id.
    #[error("invalid document identifier: {message}")]
    InvalidId { message: String },

    /// A field configuration conflicts with an existing field of a different type.
    #[error("field '{field}' is already configured as {existing}, cannot redefine as {requested}")]
    FieldConflict {
        field: String,
        existing: String,
        requested: String,
    },

    /// A condition requires a field name but none was given.
    #[error("expression requires a field name: {expression}")]
    MissingFieldName { expression: String },

    /// A configuration value cannot be used.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Invalid search parameters.
    #[error("invalid search parameter: {message}")]
    InvalidSearchParameter { message: String },
}

/// Errors raised when an alias cannot be resolved.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// No physical index is bound to the alias.
    #[error("alias '{alias}' is not bound to any index")]
    AliasUnbound { alias: String },
}

/// Errors raised when an index is absent.
#[derive(Error, Debug)]
pub enum NotFoundError {
    /// No live index exists behind the alias.
    #[error("no index found for alias '{alias}'")]
    Index { alias: String },
}

/// Errors raised when stored data cannot be reconstructed as a typed object.
#[derive(Error, Debug)]
pub enum MappingError {
    /// Serializing an object into a document failed.
    #[error("failed to convert {type_name} into a document: {message}")]
    ToDocument { type_name: String, message: String },

    /// Deserializing a document into an object failed.
    #[error("failed to map document '{id}' onto {type_name}: {message}")]
    FromDocument {
        id: String,
        type_name: String,
        message: String,
    },
}

/// Errors originating from the search engine.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The engine is currently unavailable.
    #[error("backend unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connecting to the engine failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// The engine rejected a request.
    #[error("{backend_name} {operation} failed on index '{index}': {message}")]
    Request {
        backend_name: String,
        operation: String,
        index: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The engine returned a response that could not be interpreted.
    #[error("unexpected response from {backend_name} for {operation}: {message}")]
    UnexpectedResponse {
        backend_name: String,
        operation: String,
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl BackendError {
    /// Builds a [`BackendError::Request`] without an underlying source.
    pub fn request(
        backend_name: &str,
        operation: &str,
        index: &str,
        message: impl Into<String>,
    ) -> Self {
        BackendError::Request {
            backend_name: backend_name.to_string(),
            operation: operation.to_string(),
            index: index.to_string(),
            message: message.into(),
            source: None,
        }
    }
}

/// Result type alias for search layer operations.
pub type SearchIndexResult<T> = Result<T, SearchIndexError>;

impl From<serde_json::Error> for SearchIndexError {
    fn from(err: serde_json::Error) -> Self {
        SearchIndexError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = SearchIndexError::Validation(ValidationError::MissingId {
            field: "id".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "missing document identifier: field 'id' is absent or empty"
        );
    }

    #[test]
    fn test_resolution_error_display() {
        let err = ResolutionError::AliasUnbound {
            alias: "pictures".to_string(),
        };
        assert_eq!(err.to_string(), "alias 'pictures' is not bound to any index");
    }

    #[test]
    fn test_backend_request_error_carries_context() {
        let err = BackendError::request("elasticsearch", "delete_by_query", "idx-7", "timeout");
        let msg = err.to_string();
        assert!(msg.contains("delete_by_query"));
        assert!(msg.contains("idx-7"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_from_conversions() {
        let err: SearchIndexError = NotFoundError::Index {
            alias: "a".to_string(),
        }
        .into();
        assert!(matches!(err, SearchIndexError::NotFound(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SearchIndexError = json_err.into();
        assert!(matches!(
            err,
            SearchIndexError::Backend(BackendError::SerializationError { .. })
        ));
    }
}
