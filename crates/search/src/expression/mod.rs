//! Backend-agnostic search expressions.
//!
//! An [`Expression`] is a small typed tree of search conditions. Trees are
//! built by callers, normalized with [`Expression::optimize`] and translated
//! into engine queries by each backend's query builder.
//!
//! # Optimization
//!
//! `optimize` consumes the expression and returns either an equivalent,
//! simplified expression or `None` when the condition can never constrain
//! results and should be dropped:
//!
//! - [`ValueExpression`]: dropped when the value is null or the empty string
//! - [`OperationExpression`]: operands are optimized first, vacuous ones are
//!   removed, an empty operation is dropped and a single operand replaces it
//! - [`MustNotExpression`]: dropped when the negated expression is dropped
//! - [`FulltextExpression`]: dropped when the query text is blank
//! - [`InExpression`]: null values removed, dropped when no value is left
//! - [`RangeValueExpression`]: dropped when both bounds are absent
//!
//! # Example
//!
//! ```
//! use sift_search::expression::{Boostable, Expression, OperationExpression, ValueExpression};
//!
//! let expr: Expression = OperationExpression::and([
//!     ValueExpression::new("city", "Rome").boost(2.0),
//!     ValueExpression::new("country", ""),
//! ])
//! .into();
//!
//! let optimized = expr.optimize().unwrap();
//! assert_eq!(
//!     optimized,
//!     Expression::from(ValueExpression::new("city", "Rome").boost(2.0))
//! );
//! ```

mod condition;
mod expr_value;
mod field;
mod fulltext;
mod operation;
mod suggest;
mod value;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use condition::{Comparison, Condition};
pub use expr_value::ExprValue;
pub use field::{InExpression, IsNullExpression, RangeValueExpression};
pub use fulltext::FulltextExpression;
pub use operation::{MustNotExpression, OperationExpression, Operator};
pub use suggest::SuggestExpression;
pub use value::ValueExpression;

/// Expressions that carry a relevance multiplier.
///
/// The builders consume the expression and return it with the boost set. An
/// absent boost means the engine's default weight applies.
pub trait Boostable: Sized {
    /// Returns the expression with `boost` set or cleared.
    fn with_boost(self, boost: Option<f32>) -> Self;

    /// Returns the boost, if any.
    fn boost_value(&self) -> Option<f32>;

    /// Returns the expression with the given boost.
    fn boost(self, boost: f32) -> Self {
        self.with_boost(Some(boost))
    }
}

/// A search condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Field compared against a value.
    Value(ValueExpression),
    /// AND/OR over operands.
    Operation(OperationExpression),
    /// Negation.
    MustNot(MustNotExpression),
    /// Fulltext query.
    Fulltext(FulltextExpression),
    /// Field value in a list.
    In(InExpression),
    /// Field value in a range.
    Range(RangeValueExpression),
    /// Field missing or present.
    IsNull(IsNullExpression),
    /// Matches every document.
    FindAll,
}

impl Expression {
    /// Simplifies the expression; `None` means it should be dropped.
    pub fn optimize(self) -> Option<Expression> {
        match self {
            Expression::Value(expr) => expr.optimize(),
            Expression::Operation(expr) => expr.optimize(),
            Expression::MustNot(expr) => expr.optimize(),
            Expression::Fulltext(expr) => expr.optimize(),
            Expression::In(expr) => expr.optimize(),
            Expression::Range(expr) => expr.optimize(),
            Expression::IsNull(_) | Expression::FindAll => Some(self),
        }
    }

    /// Negates this expression.
    pub fn negate(self) -> Expression {
        Expression::MustNot(MustNotExpression::new(self))
    }

    /// Checks that every field-bound node names its field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Expression::Value(expr) if expr.name().is_none() => {
                Err(ValidationError::MissingFieldName {
                    expression: self.to_string(),
                })
            }
            Expression::Operation(op) => op.operands().iter().try_for_each(Expression::validate),
            Expression::MustNot(not) => not.inner().validate(),
            _ => Ok(()),
        }
    }

    /// Returns the names of all fields referenced by the tree, in visit order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_field_names(&mut names);
        names
    }

    fn collect_field_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Value(expr) => names.extend(expr.name()),
            Expression::In(expr) => names.push(expr.name()),
            Expression::Range(expr) => names.push(expr.name()),
            Expression::IsNull(expr) => names.push(expr.name()),
            Expression::Operation(op) => {
                for operand in op.operands() {
                    operand.collect_field_names(names);
                }
            }
            Expression::MustNot(not) => not.inner().collect_field_names(names),
            Expression::Fulltext(_) | Expression::FindAll => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(expr) => {
                write!(
                    f,
                    "{} {} {}",
                    expr.name().unwrap_or("<unnamed>"),
                    expr.comparison(),
                    expr.value()
                )?;
                if expr.is_match_phrase() {
                    write!(f, " (phrase)")?;
                }
                if let Some(boost) = expr.boost_value() {
                    write!(f, "^{}", boost)?;
                }
                Ok(())
            }
            Expression::Operation(op) => {
                let joiner = match op.operator() {
                    Operator::And => " AND ",
                    Operator::Or => " OR ",
                };
                write!(f, "(")?;
                for (i, operand) in op.operands().iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", joiner)?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")
            }
            Expression::MustNot(not) => write!(f, "NOT {}", not.inner()),
            Expression::Fulltext(expr) => write!(f, "FULLTEXT \"{}\"", expr.value()),
            Expression::In(expr) => {
                write!(f, "{} IN {}", expr.name(), ExprValue::List(expr.values().to_vec()))
            }
            Expression::Range(expr) => write!(
                f,
                "{} BETWEEN {} AND {}",
                expr.name(),
                expr.min().unwrap_or(&ExprValue::Null),
                expr.max().unwrap_or(&ExprValue::Null)
            ),
            Expression::IsNull(expr) if expr.matches_present() => {
                write!(f, "{} IS NOT NULL", expr.name())
            }
            Expression::IsNull(expr) => write!(f, "{} IS NULL", expr.name()),
            Expression::FindAll => write!(f, "*"),
        }
    }
}

impl From<ValueExpression> for Expression {
    fn from(expr: ValueExpression) -> Self {
        Expression::Value(expr)
    }
}

impl From<OperationExpression> for Expression {
    fn from(expr: OperationExpression) -> Self {
        Expression::Operation(expr)
    }
}

impl From<MustNotExpression> for Expression {
    fn from(expr: MustNotExpression) -> Self {
        Expression::MustNot(expr)
    }
}

impl From<FulltextExpression> for Expression {
    fn from(expr: FulltextExpression) -> Self {
        Expression::Fulltext(expr)
    }
}

impl From<InExpression> for Expression {
    fn from(expr: InExpression) -> Self {
        Expression::In(expr)
    }
}

impl From<RangeValueExpression> for Expression {
    fn from(expr: RangeValueExpression) -> Self {
        Expression::Range(expr)
    }
}

impl From<IsNullExpression> for Expression {
    fn from(expr: IsNullExpression) -> Self {
        Expression::IsNull(expr)
    }
}
