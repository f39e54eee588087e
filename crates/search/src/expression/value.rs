//! Value expressions: match a field against a value.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{Boostable, Comparison, Condition, ExprValue, Expression};

/// Expression to match a value on a field.
///
/// By default the value is analyzed (tokenized) before matching. With
/// [`match_phrase`](Self::match_phrase) set, it is matched as one contiguous
/// phrase instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueExpression {
    condition: Condition,
    value: ExprValue,
    #[serde(default)]
    match_phrase: bool,
    #[serde(default)]
    boost: Option<f32>,
}

impl ValueExpression {
    /// Creates an equality expression on the named field.
    pub fn new(name: impl Into<String>, value: impl Into<ExprValue>) -> Self {
        Self::with_comparison(name, Comparison::Eq, value)
    }

    /// Creates an expression on the named field with the given comparison.
    pub fn with_comparison(
        name: impl Into<String>,
        comparison: Comparison,
        value: impl Into<ExprValue>,
    ) -> Self {
        Self {
            condition: Condition::new(name, comparison),
            value: value.into(),
            match_phrase: false,
            boost: None,
        }
    }

    /// Creates an expression without field name and value.
    pub fn unnamed(comparison: Comparison) -> Self {
        Self {
            condition: Condition::unnamed(comparison),
            value: ExprValue::Null,
            match_phrase: false,
            boost: None,
        }
    }

    /// Returns a copy of this expression matching against `value`.
    pub fn value_of(mut self, value: impl Into<ExprValue>) -> Self {
        self.value = value.into();
        self
    }

    /// Treats the value as a phrase (not tokenized) when `match_phrase` is true.
    pub fn match_phrase(mut self, match_phrase: bool) -> Self {
        self.match_phrase = match_phrase;
        self
    }

    /// Returns the condition (field name and comparison).
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Returns the field name.
    pub fn name(&self) -> Option<&str> {
        self.condition.name()
    }

    /// Returns the comparison operator.
    pub fn comparison(&self) -> Comparison {
        self.condition.comparison()
    }

    /// Returns the value to match.
    pub fn value(&self) -> &ExprValue {
        &self.value
    }

    /// Returns `true` if the value is matched as a phrase.
    pub fn is_match_phrase(&self) -> bool {
        self.match_phrase
    }

    /// Drops the expression when the value is null or the empty string.
    ///
    /// Only the exact empty string is treated as empty: an empty list or a
    /// blank string is still a valid condition.
    pub fn optimize(self) -> Option<Expression> {
        if self.value.is_null() || self.value.is_empty_text() {
            None
        } else {
            Some(Expression::Value(self))
        }
    }
}

impl Boostable for ValueExpression {
    fn with_boost(mut self, boost: Option<f32>) -> Self {
        self.boost = boost;
        self
    }

    fn boost_value(&self) -> Option<f32> {
        self.boost
    }
}

impl PartialEq for ValueExpression {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition
            && self.value == other.value
            && self.match_phrase == other.match_phrase
            && self.boost.map(f32::to_bits) == other.boost.map(f32::to_bits)
    }
}

impl Eq for ValueExpression {}

impl Hash for ValueExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.condition.hash(state);
        self.value.hash(state);
        self.match_phrase.hash(state);
        self.boost.map(f32::to_bits).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_optimize_keeps_non_empty_values() {
        for value in [
            ExprValue::from("Rome"),
            ExprValue::from(" "),
            ExprValue::Int(0),
            ExprValue::Bool(false),
            ExprValue::List(vec![]),
        ] {
            let expr = ValueExpression::new("city", value);
            let optimized = expr.clone().optimize();
            assert_eq!(optimized, Some(Expression::Value(expr)));
        }
    }

    #[test]
    fn test_optimize_drops_null_and_empty_string() {
        assert!(ValueExpression::new("city", ExprValue::Null).optimize().is_none());
        assert!(ValueExpression::new("city", "").optimize().is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = ValueExpression::new("title", "Alpine Lake").match_phrase(true).boost(2.0);
        let b = ValueExpression::new("title", "Alpine Lake").match_phrase(true).boost(2.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        assert_ne!(a, b.clone().match_phrase(false));
        assert_ne!(a, b.clone().boost(3.0));
        assert_ne!(a, b.clone().with_boost(None));
        assert_ne!(a, b.clone().value_of("Alpine"));
        assert_ne!(
            a,
            ValueExpression::with_comparison("title", Comparison::NotEq, "Alpine Lake")
                .match_phrase(true)
                .boost(2.0)
        );
        assert_ne!(
            a,
            ValueExpression::new("caption", "Alpine Lake")
                .match_phrase(true)
                .boost(2.0)
        );
    }

    #[test]
    fn test_boost_is_idempotent() {
        let once = ValueExpression::new("title", "lake").boost(1.5);
        let twice = ValueExpression::new("title", "lake").boost(1.5).boost(1.5);
        assert_eq!(once, twice);
        assert_eq!(once.boost_value(), Some(1.5));
    }

    #[test]
    fn test_defaults() {
        let expr = ValueExpression::new("title", "lake");
        assert!(!expr.is_match_phrase());
        assert!(expr.boost_value().is_none());
        assert_eq!(expr.comparison(), Comparison::Eq);
    }
}
