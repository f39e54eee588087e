//! In-process evaluation of expressions against documents.
//!
//! Mirrors the query DSL the Elasticsearch backend generates: text fields are
//! tokenized and lowercased, keyword-like values compare as a whole, and
//! conditions on a nested relation are evaluated per nested document.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::core::EngineQuery;
use crate::expression::{Comparison, ExprValue, Expression, Operator, ValueExpression};
use crate::types::{Document, FieldType, SortDirection, SortOption};

/// Offsets of matching nested documents, by relation.
pub(crate) type NestedMatches = HashMap<String, Vec<usize>>;

pub(crate) struct Matcher<'q> {
    query: &'q EngineQuery,
    // compiled wildcard patterns; `None` if the pattern does not compile
    wildcards: RefCell<HashMap<String, Option<Regex>>>,
}

impl<'q> Matcher<'q> {
    pub(crate) fn new(query: &'q EngineQuery) -> Self {
        Self {
            query,
            wildcards: RefCell::new(HashMap::new()),
        }
    }

    /// Returns whether `document` matches and records matching nested documents.
    pub(crate) fn matches(&self, document: &Document, nested: &mut NestedMatches) -> bool {
        self.eval(&self.query.expression, document, None, false, nested)
    }

    fn eval(
        &self,
        expression: &Expression,
        ctx: &Document,
        scope: Option<&str>,
        negated: bool,
        nested: &mut NestedMatches,
    ) -> bool {
        if scope.is_none()
            && let Some(relation) = self.query.nested_scope(expression)
        {
            let offsets: Vec<usize> = nested_elements(ctx, relation)
                .into_iter()
                .filter(|(_, element)| self.eval(expression, element, Some(relation), negated, nested))
                .map(|(offset, _)| offset)
                .collect();
            let matched = !offsets.is_empty();
            if !negated {
                nested.entry(relation.to_string()).or_insert(offsets);
            }
            return matched;
        }

        match expression {
            Expression::FindAll => true,
            Expression::Operation(op) => {
                // no short-circuit, so every nested clause records its matches
                let results: Vec<bool> = op
                    .operands()
                    .iter()
                    .map(|o| self.eval(o, ctx, scope, negated, nested))
                    .collect();
                match op.operator() {
                    Operator::And => results.iter().all(|r| *r),
                    Operator::Or => results.iter().any(|r| *r),
                }
            }
            Expression::MustNot(not) => !self.eval(not.inner(), ctx, scope, !negated, nested),
            Expression::Value(expr) => self.value_matches(expr, ctx, scope),
            Expression::Fulltext(expr) => self.fulltext_matches(expr.value(), ctx),
            Expression::In(expr) => {
                let values = self.values(expr.name(), ctx, scope);
                values.iter().any(|field| {
                    expr.values()
                        .iter()
                        .any(|v| self.compare(expr.name(), Comparison::Eq, v, false, field))
                })
            }
            Expression::Range(expr) => {
                let values = self.values(expr.name(), ctx, scope);
                values.iter().any(|field| {
                    expr.min()
                        .is_none_or(|min| self.compare(expr.name(), Comparison::Ge, min, false, field))
                        && expr
                            .max()
                            .is_none_or(|max| self.compare(expr.name(), Comparison::Le, max, false, field))
                })
            }
            Expression::IsNull(expr) => {
                let present = !self.values(expr.name(), ctx, scope).is_empty();
                present == expr.matches_present()
            }
        }
    }

    fn value_matches(&self, expr: &ValueExpression, ctx: &Document, scope: Option<&str>) -> bool {
        let Some(name) = expr.name() else {
            return false;
        };
        let comparison = expr.comparison();
        let matched = self.values(name, ctx, scope).iter().any(|field| {
            self.compare(
                name,
                comparison.positive(),
                expr.value(),
                expr.is_match_phrase(),
                field,
            )
        });
        matched != comparison.is_negation()
    }

    fn compare(
        &self,
        name: &str,
        comparison: Comparison,
        operand: &ExprValue,
        phrase: bool,
        field: &Value,
    ) -> bool {
        match operand {
            ExprValue::Null => false,
            ExprValue::List(items) => items
                .iter()
                .any(|item| self.compare(name, comparison, item, phrase, field)),
            _ => match comparison {
                Comparison::Eq | Comparison::NotEq => self.equals(name, operand, phrase, field),
                Comparison::Like | Comparison::NotLike => {
                    let pattern = operand_text(operand).to_lowercase();
                    text_candidates(field, self.is_analyzed(name))
                        .iter()
                        .any(|candidate| self.wildcard_matches(&pattern, &candidate.to_lowercase()))
                }
                Comparison::Gt | Comparison::Ge | Comparison::Lt | Comparison::Le => {
                    match compare_values(field, operand) {
                        Some(ordering) => match comparison {
                            Comparison::Gt => ordering == Ordering::Greater,
                            Comparison::Ge => ordering != Ordering::Less,
                            Comparison::Lt => ordering == Ordering::Less,
                            _ => ordering != Ordering::Greater,
                        },
                        None => false,
                    }
                }
                Comparison::TermStartsWith | Comparison::TermEndsWith | Comparison::TermWildcard => {
                    let tokenized = self.is_term_tokenized(name);
                    let mut operand = operand_text(operand);
                    if tokenized {
                        operand = operand.to_lowercase();
                    }
                    text_candidates(field, tokenized)
                        .iter()
                        .any(|candidate| match comparison {
                            Comparison::TermStartsWith => candidate.starts_with(&operand),
                            Comparison::TermEndsWith => candidate.ends_with(&operand),
                            _ => self.wildcard_matches(&operand, candidate),
                        })
                }
            },
        }
    }

    fn equals(&self, name: &str, operand: &ExprValue, phrase: bool, field: &Value) -> bool {
        match (field, operand) {
            (Value::String(text), ExprValue::Text(query)) if self.is_analyzed(name) => {
                let field_tokens = tokenize(text);
                let query_tokens = tokenize(query);
                if query_tokens.is_empty() {
                    return false;
                }
                if phrase {
                    field_tokens
                        .windows(query_tokens.len())
                        .any(|window| window == query_tokens.as_slice())
                } else {
                    query_tokens.iter().all(|t| field_tokens.contains(t))
                }
            }
            _ => compare_values(field, operand) == Some(Ordering::Equal),
        }
    }

    fn wildcard_matches(&self, pattern: &str, text: &str) -> bool {
        self.wildcards
            .borrow_mut()
            .entry(pattern.to_string())
            .or_insert_with(|| wildcard_regex(pattern))
            .as_ref()
            .is_some_and(|re| re.is_match(text))
    }

    fn fulltext_matches(&self, text: &str, ctx: &Document) -> bool {
        let query_tokens = tokenize(text);
        if query_tokens.is_empty() {
            return false;
        }
        let copied: Vec<&str> = self
            .query
            .mapping
            .fields
            .iter()
            .filter(|f| f.copy_to_fulltext)
            .map(|f| f.name.as_str())
            .collect();

        let mut strings = Vec::new();
        if copied.is_empty() {
            for value in ctx.values() {
                collect_strings(value, &mut strings);
            }
        } else {
            for name in copied {
                if let Some(value) = ctx.get(name) {
                    collect_strings(value, &mut strings);
                }
            }
        }
        let field_tokens: Vec<String> = strings.iter().flat_map(|s| tokenize(s)).collect();
        query_tokens.iter().all(|t| field_tokens.contains(t))
    }

    /// Returns the non-null values of `name`, flattening arrays.
    fn values<'d>(&self, name: &str, ctx: &'d Document, scope: Option<&str>) -> Vec<&'d Value> {
        let resolved = self.query.field_name(name);
        let path = match scope {
            Some(relation) => resolved
                .strip_prefix(relation)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(&resolved),
            None => &resolved,
        };
        lookup(ctx, path)
    }

    fn field_type(&self, name: &str) -> Option<FieldType> {
        self.query.mapping.field_at(name).map(|f| f.field_type)
    }

    // Unknown string fields behave like text with a keyword subfield.
    fn is_analyzed(&self, name: &str) -> bool {
        matches!(self.field_type(name), None | Some(FieldType::Text))
    }

    fn is_term_tokenized(&self, name: &str) -> bool {
        self.query
            .mapping
            .field_at(name)
            .is_some_and(|f| f.field_type == FieldType::Text && !f.sortable)
    }
}

/// Sorts items by the given options; missing values sort last.
pub(crate) fn sort_documents<T, F>(items: &mut [T], document: F, sort: &[SortOption], query: &EngineQuery)
where
    F: Fn(&T) -> &Document,
{
    let keys: Vec<(String, SortDirection)> = sort
        .iter()
        .filter(|s| !s.is_relevance())
        .map(|s| (query.field_name(&s.field), s.direction))
        .collect();
    if keys.is_empty() {
        return;
    }
    items.sort_by(|a, b| {
        for (path, direction) in &keys {
            let left = lookup(document(a), path).into_iter().next();
            let right = lookup(document(b), path).into_iter().next();
            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(l), Some(r)) => {
                    let ordering = compare_json(l, r);
                    match direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Returns the nested documents of `relation` with their offsets.
pub(crate) fn nested_elements<'d>(ctx: &'d Document, relation: &str) -> Vec<(usize, &'d Document)> {
    match ctx.get(relation) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_object().map(|o| (i, o)))
            .collect(),
        Some(Value::Object(object)) => vec![(0, object)],
        _ => Vec::new(),
    }
}

/// Returns the non-null values at a dotted path, flattening arrays.
pub(crate) fn lookup<'d>(ctx: &'d Document, path: &str) -> Vec<&'d Value> {
    let mut current: Vec<&Value> = Vec::new();
    let mut segments = path.split('.');
    if let Some(first) = segments.next()
        && let Some(value) = ctx.get(first)
    {
        current.push(value);
    }
    for segment in segments {
        current = current
            .into_iter()
            .flat_map(flatten)
            .filter_map(|v| v.get(segment))
            .collect();
    }
    current
        .into_iter()
        .flat_map(flatten)
        .filter(|v| !v.is_null())
        .collect()
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}

fn collect_strings<'d>(value: &'d Value, out: &mut Vec<&'d str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

fn text_candidates(field: &Value, tokenized: bool) -> Vec<String> {
    let text = match field {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if tokenized { tokenize(&text) } else { vec![text] }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn operand_text(operand: &ExprValue) -> String {
    match operand {
        ExprValue::Text(s) => s.clone(),
        ExprValue::Date(d) => d.to_rfc3339(),
        other => other.to_json().to_string(),
    }
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    Regex::new(&regex).ok()
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

/// Orders a stored value against an operand, if they are comparable.
fn compare_values(field: &Value, operand: &ExprValue) -> Option<Ordering> {
    match (field, operand) {
        (Value::Number(n), ExprValue::Int(i)) => n.as_f64()?.partial_cmp(&(*i as f64)),
        (Value::Number(n), ExprValue::Float(f)) => n.as_f64()?.partial_cmp(f),
        (Value::Number(n), ExprValue::Text(s)) => n.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?),
        (Value::Bool(b), ExprValue::Bool(o)) => Some(b.cmp(o)),
        (Value::Bool(b), ExprValue::Text(s)) => Some(b.cmp(&s.parse::<bool>().ok()?)),
        (Value::String(s), ExprValue::Date(d)) => Some(parse_date(s)?.cmp(d)),
        (Value::String(s), ExprValue::Text(o)) => match (parse_date(s), parse_date(o)) {
            (Some(left), Some(right)) => Some(left.cmp(&right)),
            _ => Some(s.as_str().cmp(o.as_str())),
        },
        (Value::String(s), ExprValue::Int(i)) => s.parse::<f64>().ok()?.partial_cmp(&(*i as f64)),
        (Value::String(s), ExprValue::Float(f)) => s.parse::<f64>().ok()?.partial_cmp(f),
        _ => None,
    }
}

fn compare_json(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{
        FulltextExpression, InExpression, IsNullExpression, MustNotExpression,
        OperationExpression, RangeValueExpression,
    };
    use crate::types::{FieldConfiguration, MappingConfiguration};
    use serde_json::json;

    fn mapping() -> MappingConfiguration {
        MappingConfiguration::new(
            vec![
                FieldConfiguration::new("title", FieldType::Text)
                    .multilingual()
                    .copy_to_fulltext(),
                FieldConfiguration::new("caption", FieldType::Text).copy_to_fulltext(),
                FieldConfiguration::new("city", FieldType::Keyword),
                FieldConfiguration::new("size", FieldType::Long),
                FieldConfiguration::new("created", FieldType::Date),
                FieldConfiguration::nested(
                    "persons",
                    vec![
                        FieldConfiguration::new("name", FieldType::Keyword),
                        FieldConfiguration::new("age", FieldType::Integer),
                    ],
                ),
            ],
            vec!["de".to_string(), "en".to_string()],
        )
    }

    fn document() -> Document {
        json!({
            "id": "1",
            "title": {"de": "Alpensee im Sommer", "en": "Alpine lake in summer"},
            "caption": "A quiet morning at the water",
            "city": "Rome",
            "size": 42,
            "created": "2024-05-01T10:00:00Z",
            "persons": [
                {"name": "Anna", "age": 31},
                {"name": "Ben", "age": 12}
            ]
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn matches(expression: impl Into<Expression>, language: Option<&str>) -> (bool, NestedMatches) {
        let query = EngineQuery::new(expression.into(), language.map(str::to_string), mapping());
        let mut nested = NestedMatches::new();
        let matched = Matcher::new(&query).matches(&document(), &mut nested);
        (matched, nested)
    }

    #[test]
    fn test_wildcard_pattern_is_compiled_once_per_query() {
        let query = EngineQuery::new(
            ValueExpression::with_comparison("city", Comparison::Like, "ro*").into(),
            None,
            mapping(),
        );
        let matcher = Matcher::new(&query);
        for _ in 0..3 {
            assert!(matcher.matches(&document(), &mut NestedMatches::new()));
        }
        assert_eq!(matcher.wildcards.borrow().len(), 1);
    }

    #[test]
    fn test_keyword_equality_is_exact() {
        assert!(matches(ValueExpression::new("city", "Rome"), None).0);
        assert!(!matches(ValueExpression::new("city", "rome"), None).0);
        assert!(matches(ValueExpression::with_comparison("city", Comparison::NotEq, "Paris"), None).0);
    }

    #[test]
    fn test_multilingual_text_matching() {
        assert!(matches(ValueExpression::new("title", "lake summer"), Some("en")).0);
        assert!(!matches(ValueExpression::new("title", "lake"), Some("de")).0);
        assert!(matches(ValueExpression::new("title", "alpensee"), None).0);
    }

    #[test]
    fn test_phrase_matching() {
        let phrase = ValueExpression::new("caption", "quiet morning").match_phrase(true);
        assert!(matches(phrase, None).0);
        let reversed = ValueExpression::new("caption", "morning quiet").match_phrase(true);
        assert!(!matches(reversed, None).0);
        assert!(matches(ValueExpression::new("caption", "morning quiet"), None).0);
    }

    #[test]
    fn test_like_and_term_comparisons() {
        assert!(matches(ValueExpression::with_comparison("caption", Comparison::Like, "mor*"), None).0);
        assert!(matches(ValueExpression::with_comparison("city", Comparison::TermStartsWith, "Ro"), None).0);
        assert!(matches(ValueExpression::with_comparison("city", Comparison::TermEndsWith, "me"), None).0);
        assert!(matches(ValueExpression::with_comparison("city", Comparison::TermWildcard, "R?m*"), None).0);
    }

    #[test]
    fn test_ranges() {
        assert!(matches(ValueExpression::with_comparison("size", Comparison::Gt, 41), None).0);
        assert!(!matches(ValueExpression::with_comparison("size", Comparison::Lt, 42), None).0);
        assert!(matches(RangeValueExpression::new("size", 40, 42), None).0);
        assert!(matches(RangeValueExpression::new("created", "2024-01-01", ExprValue::Null), None).0);
        assert!(!matches(RangeValueExpression::new("created", ExprValue::Null, "2024-01-01"), None).0);
    }

    #[test]
    fn test_in_and_is_null() {
        assert!(matches(InExpression::new("city", vec!["Paris", "Rome"]), None).0);
        assert!(!matches(InExpression::new("city", vec!["Paris"]), None).0);
        assert!(matches(IsNullExpression::new("keywords"), None).0);
        assert!(matches(IsNullExpression::not_null("city"), None).0);
    }

    #[test]
    fn test_fulltext_uses_copied_fields() {
        assert!(matches(FulltextExpression::new("alpine water"), None).0);
        assert!(!matches(FulltextExpression::new("rome"), None).0);
    }

    #[test]
    fn test_nested_conditions_match_the_same_element() {
        let same: Expression = OperationExpression::and([
            Expression::from(ValueExpression::new("persons.name", "Anna")),
            ValueExpression::with_comparison("persons.age", Comparison::Gt, 30).into(),
        ])
        .into();
        let (matched, nested) = matches(same, None);
        assert!(matched);
        assert_eq!(nested.get("persons"), Some(&vec![0]));

        let across: Expression = OperationExpression::and([
            Expression::from(ValueExpression::new("persons.name", "Ben")),
            ValueExpression::with_comparison("persons.age", Comparison::Gt, 30).into(),
        ])
        .into();
        assert!(!matches(across, None).0);
    }

    #[test]
    fn test_negated_nested_condition_means_no_element_matches() {
        let (matched, nested) = matches(
            MustNotExpression::new(ValueExpression::new("persons.name", "Anna")),
            None,
        );
        assert!(!matched);
        assert!(nested.is_empty());
        assert!(matches(MustNotExpression::new(ValueExpression::new("persons.name", "Carl")), None).0);
    }

    #[test]
    fn test_sort_documents() {
        let a = json!({"size": 3}).as_object().cloned().unwrap();
        let b = json!({"size": 1}).as_object().cloned().unwrap();
        let c = json!({}).as_object().cloned().unwrap();
        let mut docs = vec![&a, &c, &b];
        let query = EngineQuery::new(Expression::FindAll, None, mapping());
        sort_documents(&mut docs, |d| *d, &[SortOption::asc("size")], &query);
        assert_eq!(docs, vec![&b, &a, &c]);
        sort_documents(&mut docs, |d| *d, &[SortOption::desc("size")], &query);
        assert_eq!(docs, vec![&a, &b, &c]);
    }
}
