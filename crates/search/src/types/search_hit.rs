//! A single matched document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document as a flat mapping of field names to values.
pub type Document = serde_json::Map<String, Value>;

/// Field holding the document identifier.
pub const ID_FIELD: &str = "id";

/// One hit of a search: identifier, attributes and optional inner hits.
///
/// The identifier and attributes are fixed at construction. Inner hits
/// (matches inside nested documents, grouped by relation name) can be
/// attached once with [`inner_hits`](Self::inner_hits); the mapping is moved
/// into the hit, so later changes by the caller cannot reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHitDto {
    id: String,
    attributes: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inner_hits: Option<HashMap<String, Vec<SearchHitDto>>>,
}

impl SearchHitDto {
    /// Creates a hit without inner hits.
    pub fn new(id: impl Into<String>, attributes: Document) -> Self {
        Self {
            id: id.into(),
            attributes,
            inner_hits: None,
        }
    }

    /// Returns the document identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns all attributes.
    pub fn attributes(&self) -> &Document {
        &self.attributes
    }

    /// Returns the value of one attribute.
    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.attributes.get(field_name)
    }

    /// Returns the number of attributes.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }

    /// Attaches inner hits grouped by relation name.
    ///
    /// Inner hits are set at most once: if the hit already carries inner hits
    /// the given mapping is discarded.
    pub fn inner_hits(mut self, inner_hits: HashMap<String, Vec<SearchHitDto>>) -> Self {
        if self.inner_hits.is_none() {
            self.inner_hits = Some(inner_hits);
        } else {
            tracing::warn!(id = %self.id, "inner hits already set, ignoring second assignment");
        }
        self
    }

    /// Returns the inner hits, if any were attached.
    pub fn get_inner_hits(&self) -> Option<&HashMap<String, Vec<SearchHitDto>>> {
        self.inner_hits.as_ref()
    }

    /// Consumes the hit and returns its attributes.
    pub fn into_attributes(self) -> Document {
        self.attributes
    }
}
