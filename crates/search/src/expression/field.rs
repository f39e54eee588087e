//! Single-field expressions beyond plain value matching.

use serde::{Deserialize, Serialize};

use super::{ExprValue, Expression};

/// Matches documents whose field equals one of the given values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InExpression {
    name: String,
    values: Vec<ExprValue>,
}

impl InExpression {
    /// Creates an IN expression.
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<ExprValue>>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the candidate values.
    pub fn values(&self) -> &[ExprValue] {
        &self.values
    }

    /// Removes null entries and drops the expression if nothing is left.
    pub fn optimize(self) -> Option<Expression> {
        let values: Vec<ExprValue> = self.values.into_iter().filter(|v| !v.is_null()).collect();
        if values.is_empty() {
            None
        } else {
            Some(Expression::In(InExpression {
                name: self.name,
                values,
            }))
        }
    }
}

/// Inclusive range over a numeric or date field.
///
/// Either bound may be absent; a null bound counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeValueExpression {
    name: String,
    min: Option<ExprValue>,
    max: Option<ExprValue>,
}

impl RangeValueExpression {
    /// Creates a range expression.
    pub fn new(
        name: impl Into<String>,
        min: impl Into<ExprValue>,
        max: impl Into<ExprValue>,
    ) -> Self {
        let min = min.into();
        let max = max.into();
        Self {
            name: name.into(),
            min: (!min.is_null()).then_some(min),
            max: (!max.is_null()).then_some(max),
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the lower bound.
    pub fn min(&self) -> Option<&ExprValue> {
        self.min.as_ref()
    }

    /// Returns the upper bound.
    pub fn max(&self) -> Option<&ExprValue> {
        self.max.as_ref()
    }

    /// Drops the expression when neither bound is set.
    pub fn optimize(self) -> Option<Expression> {
        if self.min.is_none() && self.max.is_none() {
            None
        } else {
            Some(Expression::Range(self))
        }
    }
}

/// Matches documents where a field is missing, or present when negated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsNullExpression {
    name: String,
    #[serde(default)]
    matches_present: bool,
}

impl IsNullExpression {
    /// Matches documents without a value in `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matches_present: false,
        }
    }

    /// Matches documents with a value in `name`.
    pub fn not_null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matches_present: true,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the expression matches present values instead of missing ones.
    pub fn matches_present(&self) -> bool {
        self.matches_present
    }
}
