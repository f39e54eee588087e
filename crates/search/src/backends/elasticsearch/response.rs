//! Parsing of search and suggest responses.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::SearchResponse;
use crate::expression::SuggestExpression;
use crate::types::{Document, ID_FIELD, SearchHitDto, SuggestResult};

/// Parses a search response body.
pub(crate) fn parse_search_response(body: &Value) -> SearchResponse {
    let hits: Vec<SearchHitDto> = body
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(|h| h.as_array())
        .map(|hits| hits.iter().map(parse_hit).collect())
        .unwrap_or_default();

    let total = body.get("hits").and_then(|h| h.get("total"));
    let (total, exact_total) = match total {
        Some(total) => (
            total.get("value").and_then(|v| v.as_u64()).unwrap_or(0),
            total.get("relation").and_then(|r| r.as_str()).is_none_or(|r| r == "eq"),
        ),
        None => (hits.len() as u64, true),
    };

    SearchResponse {
        hits,
        total,
        exact_total,
    }
}

fn parse_hit(hit: &Value) -> SearchHitDto {
    let source = source_of(hit);
    let id = hit
        .get("_id")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_else(|| nested_id(hit, &source));
    with_inner_hits(SearchHitDto::new(id, source), hit)
}

// Nested hits have no `_id`; prefer the element's own id, else its offset.
fn parse_nested_hit(hit: &Value) -> SearchHitDto {
    let source = source_of(hit);
    let id = nested_id(hit, &source);
    with_inner_hits(SearchHitDto::new(id, source), hit)
}

fn nested_id(hit: &Value, source: &Document) -> String {
    match source.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => hit
            .get("_nested")
            .and_then(|n| n.get("offset"))
            .and_then(|o| o.as_u64())
            .unwrap_or(0)
            .to_string(),
    }
}

fn source_of(hit: &Value) -> Document {
    hit.get("_source")
        .and_then(|s| s.as_object())
        .cloned()
        .unwrap_or_default()
}

fn with_inner_hits(dto: SearchHitDto, hit: &Value) -> SearchHitDto {
    let Some(inner) = hit.get("inner_hits").and_then(|i| i.as_object()) else {
        return dto;
    };
    let inner_hits: HashMap<String, Vec<SearchHitDto>> = inner
        .iter()
        .map(|(name, result)| {
            let hits = result
                .get("hits")
                .and_then(|h| h.get("hits"))
                .and_then(|h| h.as_array())
                .map(|hits| hits.iter().map(parse_nested_hit).collect())
                .unwrap_or_default();
            (name.clone(), hits)
        })
        .collect();
    if inner_hits.is_empty() {
        dto
    } else {
        dto.inner_hits(inner_hits)
    }
}

/// Parses a completion suggest response body.
pub(crate) fn parse_suggest_response(body: &Value, expressions: &[SuggestExpression]) -> SuggestResult {
    let mut result = SuggestResult::new();
    for expression in expressions {
        let candidates: Vec<String> = body
            .get("suggest")
            .and_then(|s| s.get(expression.name()))
            .and_then(|entries| entries.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("options").and_then(|o| o.as_array()))
                    .flatten()
                    .filter_map(|option| option.get("text").and_then(|t| t.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        result.insert(expression.name(), candidates);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hits_total_and_inner_hits() {
        let body = json!({
            "hits": {
                "total": { "value": 12, "relation": "eq" },
                "hits": [{
                    "_id": "h1",
                    "_source": { "id": "h1", "name": "Grand Hotel" },
                    "inner_hits": {
                        "rooms": {
                            "hits": {
                                "hits": [
                                    { "_nested": { "field": "rooms", "offset": 2 }, "_source": { "label": "suite" } },
                                    { "_nested": { "field": "rooms", "offset": 0 }, "_source": { "id": "r7", "label": "double" } }
                                ]
                            }
                        }
                    }
                }]
            }
        });

        let response = parse_search_response(&body);
        assert_eq!(response.total, 12);
        assert!(response.exact_total);
        assert_eq!(response.hits.len(), 1);

        let hit = &response.hits[0];
        assert_eq!(hit.id(), "h1");
        assert_eq!(hit.get("name"), Some(&json!("Grand Hotel")));
        let rooms = &hit.get_inner_hits().unwrap()["rooms"];
        assert_eq!(rooms[0].id(), "2");
        assert_eq!(rooms[1].id(), "r7");
    }

    #[test]
    fn test_lower_bound_total() {
        let body = json!({ "hits": { "total": { "value": 10000, "relation": "gte" }, "hits": [] } });
        let response = parse_search_response(&body);

        assert_eq!(response.total, 10000);
        assert!(!response.exact_total);
        assert!(response.hits.is_empty());
    }

    #[test]
    fn test_parse_suggest() {
        let body = json!({
            "suggest": {
                "name": [{
                    "text": "gra",
                    "options": [{ "text": "Grand Hotel" }, { "text": "Granada Inn" }]
                }]
            }
        });
        let result = parse_suggest_response(
            &body,
            &[SuggestExpression::new("name", "gra"), SuggestExpression::new("city", "ro")],
        );

        assert_eq!(
            result.get("name"),
            Some(&["Grand Hotel".to_string(), "Granada Inn".to_string()][..])
        );
        assert_eq!(result.get("city"), Some(&[][..]));
    }
}
