//! Elasticsearch index settings and mapping definitions.
//!
//! Field configurations translate to mapping properties as follows:
//! - text fields get a `keyword` subfield when sortable or aggregatable
//! - multilingual fields become an object with one subfield per language
//! - fields copied to fulltext add `copy_to: ["fulltext"]`
//! - completion-enabled fields get a `suggest` completion subfield
//! - nested fields map to `type: nested` with their own properties

use serde_json::{Map, Value, json};

use crate::config::IndexSettings;
use crate::types::{
    FULLTEXT_FIELD, FieldConfiguration, FieldType, KEYWORD_SUBFIELD, MappingConfiguration,
    SUGGEST_SUBFIELD,
};

/// Key of the index version in the mapping `_meta` section.
pub(crate) const INDEX_VERSION_META: &str = "index_version";

/// Creates the body of a create-index request.
pub(crate) fn create_index_body(settings: &IndexSettings, mapping: &MappingConfiguration) -> Value {
    json!({
        "settings": {
            "number_of_shards": settings.number_of_shards,
            "number_of_replicas": settings.number_of_replicas,
            "index.max_result_window": settings.max_result_window,
            "index.mapping.total_fields.limit": settings.fields_limit,
            "refresh_interval": settings.refresh_interval,
        },
        "mappings": mapping_body(mapping),
    })
}

/// Creates the `mappings` section for the configured fields.
pub(crate) fn mapping_body(mapping: &MappingConfiguration) -> Value {
    let mut properties = Map::new();
    for field in &mapping.fields {
        properties.insert(field.name.clone(), field_mapping(field, &mapping.languages));
    }
    if has_fulltext_copies(&mapping.fields) {
        properties.insert(FULLTEXT_FIELD.to_string(), json!({ "type": "text" }));
    }
    json!({ "properties": properties })
}

/// Returns `true` if any field, nested ones included, is copied to fulltext.
pub(crate) fn has_fulltext_copies(fields: &[FieldConfiguration]) -> bool {
    fields
        .iter()
        .any(|f| f.copy_to_fulltext || has_fulltext_copies(&f.nested_fields))
}

fn field_mapping(field: &FieldConfiguration, languages: &[String]) -> Value {
    if field.is_nested() {
        let mut properties = Map::new();
        for nested in &field.nested_fields {
            properties.insert(nested.name.clone(), field_mapping(nested, languages));
        }
        return json!({ "type": "nested", "properties": properties });
    }

    if field.multilingual && !languages.is_empty() {
        let mut properties = Map::new();
        for language in languages {
            properties.insert(language.clone(), leaf_mapping(field));
        }
        return json!({ "properties": properties });
    }

    leaf_mapping(field)
}

fn leaf_mapping(field: &FieldConfiguration) -> Value {
    let mut mapping = Map::new();
    mapping.insert("type".to_string(), json!(field.field_type.as_str()));

    if field.field_type == FieldType::Text
        && let Some(analyzer) = &field.analyzer
    {
        mapping.insert("analyzer".to_string(), json!(analyzer));
    }

    let mut subfields = Map::new();
    if field.field_type == FieldType::Text && (field.sortable || field.aggregatable) {
        subfields.insert(KEYWORD_SUBFIELD.to_string(), json!({ "type": "keyword" }));
    }
    if field.with_completion && field.field_type != FieldType::Completion {
        subfields.insert(SUGGEST_SUBFIELD.to_string(), json!({ "type": "completion" }));
    }
    if !subfields.is_empty() {
        mapping.insert("fields".to_string(), Value::Object(subfields));
    }

    if field.copy_to_fulltext {
        mapping.insert("copy_to".to_string(), json!([FULLTEXT_FIELD]));
    }

    Value::Object(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> IndexSettings {
        IndexSettings {
            number_of_shards: 2,
            number_of_replicas: 0,
            max_result_window: 5000,
            fields_limit: 300,
            refresh_interval: "5s".to_string(),
        }
    }

    #[test]
    fn test_create_index_body_settings() {
        let body = create_index_body(&settings(), &MappingConfiguration::default());

        let s = &body["settings"];
        assert_eq!(s["number_of_shards"], json!(2));
        assert_eq!(s["number_of_replicas"], json!(0));
        assert_eq!(s["index.max_result_window"], json!(5000));
        assert_eq!(s["index.mapping.total_fields.limit"], json!(300));
        assert_eq!(s["refresh_interval"], json!("5s"));
        assert!(body["mappings"]["properties"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_text_field_subfields() {
        let mapping = MappingConfiguration::new(
            vec![
                FieldConfiguration::new("name", FieldType::Text)
                    .sortable()
                    .with_completion()
                    .with_analyzer("english"),
                FieldConfiguration::new("city", FieldType::Keyword),
            ],
            vec![],
        );
        let body = mapping_body(&mapping);

        let name = &body["properties"]["name"];
        assert_eq!(name["type"], json!("text"));
        assert_eq!(name["analyzer"], json!("english"));
        assert_eq!(name["fields"]["keyword"]["type"], json!("keyword"));
        assert_eq!(name["fields"]["suggest"]["type"], json!("completion"));
        assert_eq!(body["properties"]["city"], json!({ "type": "keyword" }));
    }

    #[test]
    fn test_multilingual_field_per_language() {
        let mapping = MappingConfiguration::new(
            vec![FieldConfiguration::new("title", FieldType::Text).multilingual()],
            vec!["de".to_string(), "en".to_string()],
        );
        let body = mapping_body(&mapping);

        let title = &body["properties"]["title"]["properties"];
        assert_eq!(title["de"]["type"], json!("text"));
        assert_eq!(title["en"]["type"], json!("text"));
    }

    #[test]
    fn test_nested_and_fulltext_copies() {
        let mapping = MappingConfiguration::new(
            vec![FieldConfiguration::nested(
                "rooms",
                vec![
                    FieldConfiguration::new("label", FieldType::Text).copy_to_fulltext(),
                    FieldConfiguration::new("beds", FieldType::Integer),
                ],
            )],
            vec![],
        );
        let body = mapping_body(&mapping);

        let rooms = &body["properties"]["rooms"];
        assert_eq!(rooms["type"], json!("nested"));
        assert_eq!(rooms["properties"]["label"]["copy_to"], json!(["fulltext"]));
        assert_eq!(rooms["properties"]["beds"]["type"], json!("integer"));
        assert_eq!(body["properties"]["fulltext"]["type"], json!("text"));
    }
}
