//! Boolean combinators over expressions.

use serde::{Deserialize, Serialize};

use super::Expression;

/// Logical operator joining the operands of an [`OperationExpression`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// All operands must match.
    And,
    /// At least one operand must match.
    Or,
}

/// Combines several expressions with AND or OR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationExpression {
    operator: Operator,
    operands: Vec<Expression>,
}

impl OperationExpression {
    /// Creates an operation over the given operands.
    pub fn new(operator: Operator, operands: Vec<Expression>) -> Self {
        Self { operator, operands }
    }

    /// Creates an AND operation.
    pub fn and(operands: impl IntoIterator<Item = impl Into<Expression>>) -> Self {
        Self::new(Operator::And, operands.into_iter().map(Into::into).collect())
    }

    /// Creates an OR operation.
    pub fn or(operands: impl IntoIterator<Item = impl Into<Expression>>) -> Self {
        Self::new(Operator::Or, operands.into_iter().map(Into::into).collect())
    }

    /// Adds an operand.
    pub fn add(mut self, operand: impl Into<Expression>) -> Self {
        self.operands.push(operand.into());
        self
    }

    /// Returns the operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns the operands.
    pub fn operands(&self) -> &[Expression] {
        &self.operands
    }

    /// Optimizes the operands first, then drops the vacuous ones.
    ///
    /// With no operand left the operation itself is dropped; a single
    /// surviving operand replaces the operation.
    pub fn optimize(self) -> Option<Expression> {
        let mut operands: Vec<Expression> = self
            .operands
            .into_iter()
            .filter_map(Expression::optimize)
            .collect();

        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Expression::Operation(OperationExpression {
                operator: self.operator,
                operands,
            })),
        }
    }
}

/// Negates one expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MustNotExpression {
    inner: Box<Expression>,
}

impl MustNotExpression {
    /// Creates a negation of `inner`.
    pub fn new(inner: impl Into<Expression>) -> Self {
        Self {
            inner: Box::new(inner.into()),
        }
    }

    /// Returns the negated expression.
    pub fn inner(&self) -> &Expression {
        &self.inner
    }

    /// Drops the negation when the negated expression is vacuous.
    pub fn optimize(self) -> Option<Expression> {
        let inner = (*self.inner).optimize()?;
        Some(Expression::MustNot(MustNotExpression {
            inner: Box::new(inner),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExprValue, ValueExpression};

    #[test]
    fn test_and_drops_vacuous_operands() {
        let op = OperationExpression::and([
            ValueExpression::new("city", "Rome"),
            ValueExpression::new("country", ""),
            ValueExpression::new("zip", ExprValue::Null),
            ValueExpression::new("street", "Via Appia"),
        ]);

        let optimized = op.optimize().unwrap();
        let expected = OperationExpression::and([
            ValueExpression::new("city", "Rome"),
            ValueExpression::new("street", "Via Appia"),
        ]);
        assert_eq!(optimized, Expression::Operation(expected));
    }

    #[test]
    fn test_single_operand_is_unwrapped() {
        let op = OperationExpression::or([
            ValueExpression::new("city", "Rome"),
            ValueExpression::new("country", ""),
        ]);
        assert_eq!(
            op.optimize(),
            Some(Expression::Value(ValueExpression::new("city", "Rome")))
        );
    }

    #[test]
    fn test_all_vacuous_operands_drop_operation() {
        let op = OperationExpression::and([
            ValueExpression::new("city", ""),
            ValueExpression::new("country", ExprValue::Null),
        ]);
        assert!(op.optimize().is_none());
        assert!(OperationExpression::and(Vec::<Expression>::new()).optimize().is_none());
    }

    #[test]
    fn test_nested_operations_optimize_children_first() {
        let inner = OperationExpression::or([
            ValueExpression::new("a", ""),
            ValueExpression::new("b", ""),
        ]);
        let outer = OperationExpression::and(Vec::<Expression>::new())
            .add(inner)
            .add(ValueExpression::new("c", "x"));
        assert_eq!(
            outer.optimize(),
            Some(Expression::Value(ValueExpression::new("c", "x")))
        );
    }

    #[test]
    fn test_must_not_of_vacuous_is_dropped() {
        assert!(MustNotExpression::new(ValueExpression::new("city", "")).optimize().is_none());

        let kept = MustNotExpression::new(ValueExpression::new("city", "Rome")).optimize();
        assert!(matches!(kept, Some(Expression::MustNot(_))));
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let op = OperationExpression::and([
            ValueExpression::new("city", "Rome"),
            ValueExpression::new("country", ""),
            ValueExpression::new("street", "Via Appia"),
        ]);
        let once = op.optimize().unwrap();
        let twice = once.clone().optimize().unwrap();
        assert_eq!(once, twice);
    }
}
