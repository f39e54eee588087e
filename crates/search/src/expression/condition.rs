//! Field conditions shared by the comparison expressions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator applied between a field and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Comparison {
    /// Equal (analyzed match on text fields).
    #[default]
    Eq,
    /// Not equal.
    NotEq,
    /// Wildcard match (`*` and `?`) on the analyzed value.
    Like,
    /// Negated wildcard match.
    NotLike,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Whole term starts with the value.
    TermStartsWith,
    /// Whole term ends with the value.
    TermEndsWith,
    /// Whole term matches the wildcard pattern.
    TermWildcard,
}

impl Comparison {
    /// Returns `true` for operators that negate their positive counterpart.
    pub fn is_negation(&self) -> bool {
        matches!(self, Comparison::NotEq | Comparison::NotLike)
    }

    /// Returns `true` for ordering operators.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Comparison::Gt | Comparison::Ge | Comparison::Lt | Comparison::Le
        )
    }

    /// Returns the positive counterpart of a negated operator.
    pub fn positive(&self) -> Comparison {
        match self {
            Comparison::NotEq => Comparison::Eq,
            Comparison::NotLike => Comparison::Like,
            other => *other,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparison::Eq => "=",
            Comparison::NotEq => "!=",
            Comparison::Like => "LIKE",
            Comparison::NotLike => "NOT LIKE",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::TermStartsWith => "STARTS WITH",
            Comparison::TermEndsWith => "ENDS WITH",
            Comparison::TermWildcard => "WILDCARD",
        };
        write!(f, "{}", s)
    }
}

/// A field name paired with a comparison operator.
///
/// The name is optional: only expressions that do not address a single field
/// may leave it out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Condition {
    name: Option<String>,
    comparison: Comparison,
}

impl Condition {
    /// Creates a condition on the named field.
    pub fn new(name: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            name: Some(name.into()),
            comparison,
        }
    }

    /// Creates a condition without a field name.
    pub fn unnamed(comparison: Comparison) -> Self {
        Self {
            name: None,
            comparison,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the comparison operator.
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_comparison_is_eq() {
        assert_eq!(Comparison::default(), Comparison::Eq);
    }

    #[test]
    fn test_negation() {
        assert!(Comparison::NotEq.is_negation());
        assert_eq!(Comparison::NotLike.positive(), Comparison::Like);
        assert_eq!(Comparison::Gt.positive(), Comparison::Gt);
        assert!(Comparison::Le.is_range());
    }

    #[test]
    fn test_unnamed_condition() {
        let condition = Condition::unnamed(Comparison::Eq);
        assert!(condition.name().is_none());
        assert_eq!(Condition::new("city", Comparison::Eq).name(), Some("city"));
    }
}
