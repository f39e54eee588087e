//! Fulltext expressions over the catch-all fulltext field.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{Boostable, Expression};

/// Analyzed query over all fields copied into the fulltext field.
///
/// The query text supports the engine's simple query syntax (`+`, `-`, `"`,
/// `*`, `|`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulltextExpression {
    value: String,
    #[serde(default)]
    boost: Option<f32>,
}

impl FulltextExpression {
    /// Creates a fulltext expression.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            boost: None,
        }
    }

    /// Returns the query text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Drops the expression when the query text is blank.
    pub fn optimize(self) -> Option<Expression> {
        if self.value.trim().is_empty() {
            None
        } else {
            Some(Expression::Fulltext(self))
        }
    }
}

impl Boostable for FulltextExpression {
    fn with_boost(mut self, boost: Option<f32>) -> Self {
        self.boost = boost;
        self
    }

    fn boost_value(&self) -> Option<f32> {
        self.boost
    }
}

impl PartialEq for FulltextExpression {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.boost.map(f32::to_bits) == other.boost.map(f32::to_bits)
    }
}

impl Eq for FulltextExpression {}

impl Hash for FulltextExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.boost.map(f32::to_bits).hash(state);
    }
}
