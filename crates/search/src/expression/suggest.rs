//! Suggest (search-as-you-type) requests.

use serde::{Deserialize, Serialize};

fn default_count() -> usize {
    10
}

/// Requests completion candidates for a prefix typed into a completion field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestExpression {
    name: String,
    text: String,
    #[serde(default = "default_count")]
    count: usize,
}

impl SuggestExpression {
    /// Creates a suggest request for `text` on the completion field `name`.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            count: default_count(),
        }
    }

    /// Sets the maximum number of candidates.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Returns the completion field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the typed prefix.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the maximum number of candidates.
    pub fn count(&self) -> usize {
        self.count
    }
}
