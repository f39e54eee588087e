//! Typed objects stored as documents.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{MappingError, SearchIndexResult, ValidationError};

use super::{Document, ID_FIELD};

/// A typed object that can be stored in the index.
///
/// The object serializes into a JSON object whose fields become document
/// attributes. Its identifier is taken from [`id`](IndexObject::id) unless an
/// explicit id is given when adding it.
pub trait IndexObject: Serialize + DeserializeOwned + Send + Sync {
    /// Returns the identifier of this object, if it has one.
    fn id(&self) -> Option<String>;
}

/// Converts an object into a document, with `id` set from `explicit_id` or
/// the object's own identifier.
pub fn to_document<T: IndexObject>(object: &T, explicit_id: Option<&str>) -> SearchIndexResult<Document> {
    let id = match explicit_id {
        Some(id) => Some(id.to_string()),
        None => object.id(),
    }
    .filter(|id| !id.is_empty())
    .ok_or_else(|| ValidationError::MissingId {
        field: ID_FIELD.to_string(),
    })?;

    let value = serde_json::to_value(object).map_err(|e| MappingError::ToDocument {
        type_name: std::any::type_name::<T>().to_string(),
        message: e.to_string(),
    })?;
    let mut document = match value {
        Value::Object(map) => map,
        other => {
            return Err(MappingError::ToDocument {
                type_name: std::any::type_name::<T>().to_string(),
                message: format!("expected a JSON object, got {}", other),
            }
            .into());
        }
    };
    let keep_serialized =
        explicit_id.is_none() && document_id(&document).is_ok_and(|existing| existing == id);
    if !keep_serialized {
        let value = id_value(document.get(ID_FIELD), id);
        document.insert(ID_FIELD.to_string(), value);
    }
    Ok(document)
}

// Numeric id fields stay numeric when the new id is an integer.
fn id_value(serialized: Option<&Value>, id: String) -> Value {
    if let Some(Value::Number(_)) = serialized {
        if let Ok(n) = id.parse::<u64>() {
            return Value::from(n);
        }
        if let Ok(n) = id.parse::<i64>() {
            return Value::from(n);
        }
    }
    Value::String(id)
}

/// Reconstructs a typed object from a stored document.
pub fn from_document<T: IndexObject>(id: &str, document: Document) -> SearchIndexResult<T> {
    serde_json::from_value(Value::Object(document)).map_err(|e| {
        MappingError::FromDocument {
            id: id.to_string(),
            type_name: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Extracts the identifier of a document.
///
/// Strings are used as-is and integers are converted to text; anything else
/// is rejected.
pub fn document_id(document: &Document) -> SearchIndexResult<String> {
    match document.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        None | Some(Value::Null) | Some(Value::String(_)) => Err(ValidationError::MissingId {
            field: ID_FIELD.to_string(),
        }
        .into()),
        Some(other) => Err(ValidationError::InvalidId {
            message: format!("'{}' must be a string or integer, got {}", ID_FIELD, other),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchIndexError;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Picture {
        id: Option<String>,
        title: String,
    }

    impl IndexObject for Picture {
        fn id(&self) -> Option<String> {
            self.id.clone()
        }
    }

    #[test]
    fn test_to_document_uses_object_id() {
        let picture = Picture {
            id: Some("p1".to_string()),
            title: "Lake".to_string(),
        };
        let document = to_document(&picture, None).unwrap();
        assert_eq!(document.get("id"), Some(&json!("p1")));
        assert_eq!(document.get("title"), Some(&json!("Lake")));
    }

    #[test]
    fn test_explicit_id_overrides_object_id() {
        let picture = Picture {
            id: Some("p1".to_string()),
            title: "Lake".to_string(),
        };
        let document = to_document(&picture, Some("p2")).unwrap();
        assert_eq!(document.get("id"), Some(&json!("p2")));
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        id: u64,
        label: String,
    }

    impl IndexObject for Counter {
        fn id(&self) -> Option<String> {
            Some(self.id.to_string())
        }
    }

    #[test]
    fn test_numeric_id_survives_round_trip() {
        let counter = Counter {
            id: 42,
            label: "Lake".to_string(),
        };
        let document = to_document(&counter, None).unwrap();
        assert_eq!(document.get("id"), Some(&json!(42)));
        assert_eq!(document_id(&document).unwrap(), "42");
        assert_eq!(from_document::<Counter>("42", document).unwrap(), counter);

        let document = to_document(&counter, Some("7")).unwrap();
        assert_eq!(document.get("id"), Some(&json!(7)));

        let document = to_document(&counter, Some("c-7")).unwrap();
        assert_eq!(document.get("id"), Some(&json!("c-7")));
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let picture = Picture {
            id: None,
            title: "Lake".to_string(),
        };
        assert!(matches!(
            to_document(&picture, None),
            Err(SearchIndexError::Validation(ValidationError::MissingId { .. }))
        ));
        assert!(to_document(&picture, Some("")).is_err());
    }

    #[test]
    fn test_from_document_reports_mapping_error() {
        let document = json!({"id": "p1", "title": 7}).as_object().cloned().unwrap();
        assert!(matches!(
            from_document::<Picture>("p1", document),
            Err(SearchIndexError::Mapping(MappingError::FromDocument { .. }))
        ));
    }

    #[test]
    fn test_document_id() {
        let doc = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(document_id(&doc(json!({"id": "a"}))).unwrap(), "a");
        assert_eq!(document_id(&doc(json!({"id": 42}))).unwrap(), "42");
        assert!(matches!(
            document_id(&doc(json!({"id": ""}))),
            Err(SearchIndexError::Validation(ValidationError::MissingId { .. }))
        ));
        assert!(matches!(
            document_id(&doc(json!({"id": [1]}))),
            Err(SearchIndexError::Validation(ValidationError::InvalidId { .. }))
        ));
    }
}
