//! Elasticsearch Query DSL builder.
//!
//! Translates optimized expressions into Query DSL JSON. Conditions on a
//! nested relation are wrapped in a `nested` query so that an AND over
//! `rooms.beds` and `rooms.label` has to match within one room.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::core::{EngineQuery, SearchRequest};
use crate::expression::{Boostable, Comparison, ExprValue, Expression, Operator, SuggestExpression, ValueExpression};
use crate::types::{
    FULLTEXT_FIELD, FieldType, InnerHitsOption, KEYWORD_SUBFIELD, MappingConfiguration,
    SUGGEST_SUBFIELD, SortDirection, SortOption,
};

use super::schema::has_fulltext_copies;

/// Builds Query DSL for one engine query.
pub(crate) struct EsQueryBuilder<'q> {
    query: &'q EngineQuery,
    inner_hits: &'q [InnerHitsOption],
}

impl<'q> EsQueryBuilder<'q> {
    /// Creates a builder that requests no inner hits.
    pub(crate) fn new(query: &'q EngineQuery) -> Self {
        Self {
            query,
            inner_hits: &[],
        }
    }

    /// Requests inner hits for the given relations.
    pub(crate) fn with_inner_hits(mut self, inner_hits: &'q [InnerHitsOption]) -> Self {
        self.inner_hits = inner_hits;
        self
    }

    /// Builds the `query` clause.
    pub(crate) fn build_query(&self) -> Value {
        let mut granted = HashSet::new();
        let clause = self.clause(&self.query.expression, None, false, &mut granted);

        // relations without a matching nested clause still return their elements
        let extra: Vec<Value> = self
            .inner_hits
            .iter()
            .filter(|option| !granted.contains(option.relation.as_str()))
            .map(|option| {
                json!({
                    "nested": {
                        "path": option.relation,
                        "query": { "match_all": {} },
                        "inner_hits": inner_hits_body(option),
                    }
                })
            })
            .collect();

        if extra.is_empty() {
            clause
        } else {
            json!({ "bool": { "must": [clause], "should": extra } })
        }
    }

    fn clause<'e>(
        &self,
        expression: &'e Expression,
        scope: Option<&str>,
        negated: bool,
        granted: &mut HashSet<&'e str>,
    ) -> Value {
        if scope.is_none()
            && let Some(relation) = self.query.nested_scope(expression)
        {
            let inner = self.clause(expression, Some(relation), negated, granted);
            let mut nested = json!({ "nested": { "path": relation, "query": inner } });
            if !negated
                && let Some(option) = self.inner_hits.iter().find(|o| o.relation == relation)
                && granted.insert(relation)
            {
                nested["nested"]["inner_hits"] = inner_hits_body(option);
            }
            return nested;
        }

        match expression {
            Expression::FindAll => json!({ "match_all": {} }),
            Expression::Operation(op) => {
                let clauses: Vec<Value> = op
                    .operands()
                    .iter()
                    .map(|o| self.clause(o, scope, negated, granted))
                    .collect();
                match op.operator() {
                    Operator::And => json!({ "bool": { "must": clauses } }),
                    Operator::Or => json!({ "bool": { "should": clauses, "minimum_should_match": 1 } }),
                }
            }
            Expression::MustNot(not) => {
                let inner = self.clause(not.inner(), scope, !negated, granted);
                json!({ "bool": { "must_not": [inner] } })
            }
            Expression::Value(expr) => self.value_clause(expr),
            Expression::Fulltext(expr) => {
                let fields = if has_fulltext_copies(&self.query.mapping.fields) {
                    json!([FULLTEXT_FIELD])
                } else {
                    json!(["*"])
                };
                json!({
                    "simple_query_string": {
                        "query": expr.value(),
                        "fields": fields,
                        "default_operator": "and",
                        "lenient": true,
                    }
                })
            }
            Expression::In(expr) => {
                let clauses: Vec<Value> = expr
                    .values()
                    .iter()
                    .map(|v| self.compare(expr.name(), Comparison::Eq, v, false))
                    .collect();
                json!({ "bool": { "should": clauses, "minimum_should_match": 1 } })
            }
            Expression::Range(expr) => {
                let mut bounds = Map::new();
                if let Some(min) = expr.min() {
                    bounds.insert("gte".to_string(), min.to_json());
                }
                if let Some(max) = expr.max() {
                    bounds.insert("lte".to_string(), max.to_json());
                }
                json!({ "range": { self.query.field_name(expr.name()): bounds } })
            }
            Expression::IsNull(expr) => {
                let exists = json!({ "exists": { "field": self.query.field_name(expr.name()) } });
                if expr.matches_present() {
                    exists
                } else {
                    json!({ "bool": { "must_not": [exists] } })
                }
            }
        }
    }

    fn value_clause(&self, expr: &ValueExpression) -> Value {
        let Some(name) = expr.name() else {
            return json!({ "match_none": {} });
        };
        let comparison = expr.comparison();
        let mut clause = self.compare(name, comparison.positive(), expr.value(), expr.is_match_phrase());
        if let Some(boost) = expr.boost_value() {
            apply_boost(&mut clause, boost);
        }
        if comparison.is_negation() {
            json!({ "bool": { "must_not": [clause] } })
        } else {
            clause
        }
    }

    fn compare(&self, name: &str, comparison: Comparison, operand: &ExprValue, phrase: bool) -> Value {
        if let ExprValue::List(items) = operand {
            let clauses: Vec<Value> = items
                .iter()
                .map(|item| self.compare(name, comparison, item, phrase))
                .collect();
            return json!({ "bool": { "should": clauses, "minimum_should_match": 1 } });
        }

        let field = self.query.field_name(name);
        match comparison {
            Comparison::Eq | Comparison::NotEq => match operand {
                ExprValue::Text(text) if self.is_analyzed(name) => {
                    if phrase {
                        json!({ "match_phrase": { field: { "query": text } } })
                    } else {
                        json!({ "match": { field: { "query": text, "operator": "and" } } })
                    }
                }
                _ => json!({ "term": { field: { "value": operand.to_json() } } }),
            },
            Comparison::Like | Comparison::NotLike => {
                let pattern = operand_text(operand).to_lowercase();
                json!({ "wildcard": { field: { "value": pattern, "case_insensitive": true } } })
            }
            Comparison::Gt | Comparison::Ge | Comparison::Lt | Comparison::Le => {
                let key = match comparison {
                    Comparison::Gt => "gt",
                    Comparison::Ge => "gte",
                    Comparison::Lt => "lt",
                    _ => "lte",
                };
                json!({ "range": { field: { key: operand.to_json() } } })
            }
            Comparison::TermStartsWith | Comparison::TermEndsWith | Comparison::TermWildcard => {
                let (field, value) = self.term_target(name, field, operand_text(operand));
                match comparison {
                    Comparison::TermStartsWith => json!({ "prefix": { field: { "value": value } } }),
                    Comparison::TermEndsWith => {
                        json!({ "wildcard": { field: { "value": format!("*{}", escape_wildcard(&value)) } } })
                    }
                    _ => json!({ "wildcard": { field: { "value": value } } }),
                }
            }
        }
    }

    /// Picks the field and value a whole-term query runs against.
    ///
    /// Non-sortable text only has analyzed tokens, which are lowercase.
    /// Everything else string-like compares against the unanalyzed value.
    fn term_target(&self, name: &str, field: String, value: String) -> (String, String) {
        match self.query.mapping.field_at(name) {
            Some(config) if config.field_type == FieldType::Text && !config.sortable => {
                (field, value.to_lowercase())
            }
            Some(config) if config.field_type != FieldType::Text => (field, value),
            _ => (format!("{}.{}", field, KEYWORD_SUBFIELD), value),
        }
    }

    // Unknown string fields are dynamically mapped as text.
    fn is_analyzed(&self, name: &str) -> bool {
        matches!(
            self.query.mapping.field_at(name).map(|f| f.field_type),
            None | Some(FieldType::Text)
        )
    }

    /// Builds the `sort` clause.
    pub(crate) fn build_sort(&self, options: &[SortOption]) -> Value {
        let clauses: Vec<Value> = options
            .iter()
            .map(|option| {
                let order = match option.direction {
                    SortDirection::Ascending => "asc",
                    SortDirection::Descending => "desc",
                };
                if option.is_relevance() {
                    return json!({ "_score": { "order": order } });
                }

                let mut field = self.query.field_name(&option.field);
                if self
                    .query
                    .mapping
                    .field_at(&option.field)
                    .is_some_and(|f| f.field_type == FieldType::Text)
                {
                    field = format!("{}.{}", field, KEYWORD_SUBFIELD);
                }
                let mut clause = json!({ "order": order, "missing": "_last" });
                if let Some(relation) = self.query.mapping.nested_relation(&option.field) {
                    clause["nested"] = json!({ "path": relation });
                }
                json!({ field: clause })
            })
            .collect();
        Value::Array(clauses)
    }
}

/// Builds a complete search body.
pub(crate) fn build_search_body(request: &SearchRequest) -> Value {
    let builder = EsQueryBuilder::new(&request.query).with_inner_hits(&request.inner_hits);
    let mut body = json!({
        "query": builder.build_query(),
        "from": request.from,
        "size": request.size,
    });
    if !request.sort.is_empty() {
        body["sort"] = builder.build_sort(&request.sort);
    }
    if !request.fields_to_resolve.is_empty() {
        body["_source"] = json!({ "includes": request.fields_to_resolve });
    }
    body
}

/// Builds a delete-by-query body.
pub(crate) fn build_delete_body(query: &EngineQuery) -> Value {
    json!({ "query": EsQueryBuilder::new(query).build_query() })
}

/// Builds a completion suggest body, one suggester per expression.
pub(crate) fn build_suggest_body(mapping: &MappingConfiguration, expressions: &[SuggestExpression]) -> Value {
    let mut suggesters = Map::new();
    for expression in expressions {
        let name = expression.name();
        let mut field = mapping.resolve_field_name(name, None);
        if mapping
            .field_at(name)
            .is_none_or(|f| f.field_type != FieldType::Completion)
        {
            field = format!("{}.{}", field, SUGGEST_SUBFIELD);
        }
        suggesters.insert(
            name.to_string(),
            json!({
                "prefix": expression.text(),
                "completion": {
                    "field": field,
                    "skip_duplicates": true,
                    "size": expression.count(),
                }
            }),
        );
    }
    json!({ "size": 0, "_source": false, "suggest": suggesters })
}

fn inner_hits_body(option: &InnerHitsOption) -> Value {
    json!({ "name": option.relation, "size": option.size })
}

fn apply_boost(clause: &mut Value, boost: f32) {
    let Some((kind, body)) = clause.as_object_mut().and_then(|c| c.iter_mut().next()) else {
        return;
    };
    let target = if kind == "bool" {
        body.as_object_mut()
    } else {
        body.as_object_mut()
            .and_then(|fields| fields.values_mut().next())
            .and_then(Value::as_object_mut)
    };
    if let Some(target) = target {
        target.insert("boost".to_string(), json!(boost));
    }
}

fn operand_text(operand: &ExprValue) -> String {
    match operand {
        ExprValue::Text(text) => text.clone(),
        other => match other.to_json() {
            Value::String(s) => s,
            value => value.to_string(),
        },
    }
}

fn escape_wildcard(value: &str) -> String {
    value.replace('\\', "\\\\").replace('*', "\\*").replace('?', "\\?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{
        FulltextExpression, InExpression, IsNullExpression, MustNotExpression, OperationExpression,
        RangeValueExpression,
    };
    use crate::types::FieldConfiguration;

    fn mapping() -> MappingConfiguration {
        MappingConfiguration::new(
            vec![
                FieldConfiguration::new("name", FieldType::Text).sortable(),
                FieldConfiguration::new("description", FieldType::Text).copy_to_fulltext(),
                FieldConfiguration::new("city", FieldType::Keyword),
                FieldConfiguration::new("stars", FieldType::Integer),
                FieldConfiguration::new("title", FieldType::Text).multilingual(),
                FieldConfiguration::nested(
                    "rooms",
                    vec![
                        FieldConfiguration::new("label", FieldType::Text),
                        FieldConfiguration::new("beds", FieldType::Integer),
                    ],
                ),
            ],
            vec!["de".to_string(), "en".to_string()],
        )
    }

    fn query(expression: impl Into<Expression>) -> EngineQuery {
        EngineQuery::new(expression.into(), None, mapping())
    }

    #[test]
    fn test_text_equality_is_match_with_and() {
        let q = query(ValueExpression::new("name", "grand hotel"));
        let dsl = EsQueryBuilder::new(&q).build_query();

        assert_eq!(dsl["match"]["name"]["query"], json!("grand hotel"));
        assert_eq!(dsl["match"]["name"]["operator"], json!("and"));
    }

    #[test]
    fn test_phrase_and_boost() {
        let q = query(ValueExpression::new("name", "grand hotel").match_phrase(true).boost(2.0));
        let dsl = EsQueryBuilder::new(&q).build_query();

        assert_eq!(dsl["match_phrase"]["name"]["query"], json!("grand hotel"));
        assert_eq!(dsl["match_phrase"]["name"]["boost"], json!(2.0));
    }

    #[test]
    fn test_keyword_equality_is_term_and_negation_is_must_not() {
        let q = query(ValueExpression::with_comparison("city", Comparison::NotEq, "Rome"));
        let dsl = EsQueryBuilder::new(&q).build_query();

        assert_eq!(dsl["bool"]["must_not"][0]["term"]["city"]["value"], json!("Rome"));
    }

    #[test]
    fn test_multilingual_field_gets_language_suffix() {
        let q = EngineQuery::new(
            ValueExpression::new("title", "Zimmer").into(),
            Some("en".to_string()),
            mapping(),
        );
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert!(dsl["match"].get("title.en").is_some());

        let q = query(ValueExpression::new("title", "Zimmer"));
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert!(dsl["match"].get("title.de").is_some());
    }

    #[test]
    fn test_term_comparisons_pick_target_field() {
        let q = query(ValueExpression::with_comparison("name", Comparison::TermStartsWith, "Gra"));
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert_eq!(dsl["prefix"]["name.keyword"]["value"], json!("Gra"));

        let q = query(ValueExpression::with_comparison("description", Comparison::TermStartsWith, "Qui"));
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert_eq!(dsl["prefix"]["description"]["value"], json!("qui"));

        let q = query(ValueExpression::with_comparison("city", Comparison::TermEndsWith, "ome"));
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert_eq!(dsl["wildcard"]["city"]["value"], json!("*ome"));
    }

    #[test]
    fn test_like_is_case_insensitive_wildcard() {
        let q = query(ValueExpression::with_comparison("name", Comparison::Like, "Gr*"));
        let dsl = EsQueryBuilder::new(&q).build_query();

        assert_eq!(dsl["wildcard"]["name"]["value"], json!("gr*"));
        assert_eq!(dsl["wildcard"]["name"]["case_insensitive"], json!(true));
    }

    #[test]
    fn test_ranges_in_and_is_null() {
        let q = query(OperationExpression::and([
            Expression::from(ValueExpression::with_comparison("stars", Comparison::Ge, 3)),
            Expression::from(RangeValueExpression::new("stars", 1, 4)),
            Expression::from(InExpression::new("city", ["Rome", "Paris"])),
            Expression::from(IsNullExpression::new("city")),
        ]));
        let dsl = EsQueryBuilder::new(&q).build_query();

        let must = &dsl["bool"]["must"];
        assert_eq!(must[0]["range"]["stars"]["gte"], json!(3));
        assert_eq!(must[1]["range"]["stars"], json!({ "gte": 1, "lte": 4 }));
        assert_eq!(must[2]["bool"]["should"].as_array().unwrap().len(), 2);
        assert_eq!(must[2]["bool"]["minimum_should_match"], json!(1));
        assert_eq!(must[3]["bool"]["must_not"][0]["exists"]["field"], json!("city"));
    }

    #[test]
    fn test_fulltext_uses_copy_to_field() {
        let q = query(FulltextExpression::new("quiet room"));
        let dsl = EsQueryBuilder::new(&q).build_query();

        assert_eq!(dsl["simple_query_string"]["fields"], json!(["fulltext"]));
        assert_eq!(dsl["simple_query_string"]["default_operator"], json!("and"));

        let q = EngineQuery::new(
            FulltextExpression::new("quiet").into(),
            None,
            MappingConfiguration::default(),
        );
        let dsl = EsQueryBuilder::new(&q).build_query();
        assert_eq!(dsl["simple_query_string"]["fields"], json!(["*"]));
    }

    #[test]
    fn test_nested_and_is_one_nested_clause_with_inner_hits() {
        let q = query(OperationExpression::and([
            ValueExpression::new("rooms.label", "suite"),
            ValueExpression::with_comparison("rooms.beds", Comparison::Ge, 2),
        ]));
        let options = vec![InnerHitsOption::new("rooms").with_size(2)];
        let dsl = EsQueryBuilder::new(&q).with_inner_hits(&options).build_query();

        let nested = &dsl["nested"];
        assert_eq!(nested["path"], json!("rooms"));
        assert_eq!(nested["query"]["bool"]["must"].as_array().unwrap().len(), 2);
        assert_eq!(nested["inner_hits"], json!({ "name": "rooms", "size": 2 }));
    }

    #[test]
    fn test_negated_nested_clause_gets_no_inner_hits() {
        let q = query(MustNotExpression::new(ValueExpression::new("rooms.label", "suite")));
        let options = vec![InnerHitsOption::new("rooms")];
        let dsl = EsQueryBuilder::new(&q).with_inner_hits(&options).build_query();

        let negated = &dsl["bool"]["must"][0]["bool"]["must_not"][0]["nested"];
        assert_eq!(negated["path"], json!("rooms"));
        assert!(negated.get("inner_hits").is_none());
        assert_eq!(dsl["bool"]["should"][0]["nested"]["query"], json!({ "match_all": {} }));
        assert_eq!(dsl["bool"]["should"][0]["nested"]["inner_hits"]["name"], json!("rooms"));
    }

    #[test]
    fn test_sort_uses_keyword_subfield_for_text() {
        let q = query(Expression::FindAll);
        let sort = EsQueryBuilder::new(&q).build_sort(&[
            SortOption::asc("name"),
            SortOption::desc("stars"),
            SortOption::relevance(),
            SortOption::asc("rooms.beds"),
        ]);

        assert_eq!(sort[0]["name.keyword"]["order"], json!("asc"));
        assert_eq!(sort[1]["stars"]["order"], json!("desc"));
        assert!(sort[2].get("_score").is_some());
        assert_eq!(sort[3]["rooms.beds"]["nested"]["path"], json!("rooms"));
    }

    #[test]
    fn test_search_body_paging_and_source() {
        let request = SearchRequest {
            query: query(Expression::FindAll),
            from: 20,
            size: 10,
            sort: vec![],
            inner_hits: vec![],
            fields_to_resolve: vec!["name".to_string()],
        };
        let body = build_search_body(&request);

        assert_eq!(body["query"], json!({ "match_all": {} }));
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
        assert_eq!(body["_source"]["includes"], json!(["name"]));
        assert!(body.get("sort").is_none());
    }

    #[test]
    fn test_suggest_body() {
        let body = build_suggest_body(&mapping(), &[SuggestExpression::new("name", "gra").with_count(5)]);

        let suggester = &body["suggest"]["name"];
        assert_eq!(suggester["prefix"], json!("gra"));
        assert_eq!(suggester["completion"]["field"], json!("name.suggest"));
        assert_eq!(suggester["completion"]["size"], json!(5));
        assert_eq!(suggester["completion"]["skip_duplicates"], json!(true));
    }
}
