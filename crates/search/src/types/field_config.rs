//! Field mapping configuration.
//!
//! A [`MappingConfiguration`] describes the fields of the index: their types,
//! whether they are sortable or multilingual, and which nested relations exist.
//! Backends turn it into an engine mapping; the search facade uses it to
//! resolve language-specific field names and nested relations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Catch-all field that receives the text of every `copy_to_fulltext` field.
pub const FULLTEXT_FIELD: &str = "fulltext";

/// Subfield holding the unanalyzed value of a sortable text field.
pub const KEYWORD_SUBFIELD: &str = "keyword";

/// Subfield holding completion data.
pub const SUGGEST_SUBFIELD: &str = "suggest";

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Analyzed text.
    #[default]
    Text,
    /// Unanalyzed exact value.
    Keyword,
    /// 64-bit integer.
    Long,
    /// 32-bit integer.
    Integer,
    /// Double precision float.
    Double,
    /// Boolean.
    Boolean,
    /// Date or date-time.
    Date,
    /// Array of sub-documents matched independently.
    Nested,
    /// Completion (suggest) data.
    Completion,
}

impl FieldType {
    /// Returns the engine's type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Keyword => "keyword",
            FieldType::Long => "long",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Nested => "nested",
            FieldType::Completion => "completion",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    /// Field name. Nested subfields use their local name.
    pub name: String,

    /// Storage type.
    #[serde(default)]
    pub field_type: FieldType,

    /// Adds an unanalyzed subfield used for sorting text.
    #[serde(default)]
    pub sortable: bool,

    /// Marks the field as usable for aggregations.
    #[serde(default)]
    pub aggregatable: bool,

    /// Stores one value per configured language under `name.<lang>`.
    #[serde(default)]
    pub multilingual: bool,

    /// Copies the value into the catch-all fulltext field.
    #[serde(default)]
    pub copy_to_fulltext: bool,

    /// Analyzer for text fields.
    #[serde(default)]
    pub analyzer: Option<String>,

    /// Adds a completion subfield for suggest requests.
    #[serde(default)]
    pub with_completion: bool,

    /// Subfields of a nested field.
    #[serde(default)]
    pub nested_fields: Vec<FieldConfiguration>,
}

impl FieldConfiguration {
    /// Creates a field of the given type with all options off.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            sortable: false,
            aggregatable: false,
            multilingual: false,
            copy_to_fulltext: false,
            analyzer: None,
            with_completion: false,
            nested_fields: Vec::new(),
        }
    }

    /// Creates a nested relation with the given subfields.
    pub fn nested(name: impl Into<String>, nested_fields: Vec<FieldConfiguration>) -> Self {
        let mut field = Self::new(name, FieldType::Nested);
        field.nested_fields = nested_fields;
        field
    }

    /// Makes the field sortable.
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Makes the field aggregatable.
    pub fn aggregatable(mut self) -> Self {
        self.aggregatable = true;
        self
    }

    /// Makes the field multilingual.
    pub fn multilingual(mut self) -> Self {
        self.multilingual = true;
        self
    }

    /// Copies the field into the fulltext field.
    pub fn copy_to_fulltext(mut self) -> Self {
        self.copy_to_fulltext = true;
        self
    }

    /// Sets the analyzer.
    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Adds a completion subfield.
    pub fn with_completion(mut self) -> Self {
        self.with_completion = true;
        self
    }

    /// Returns `true` for nested relations.
    pub fn is_nested(&self) -> bool {
        self.field_type == FieldType::Nested
    }

    /// Returns the nested subfield with the given local name.
    pub fn nested_field(&self, name: &str) -> Option<&FieldConfiguration> {
        self.nested_fields.iter().find(|f| f.name == name)
    }

    /// Checks that `other` can be added next to `self` without changing any
    /// existing field's type.
    fn check_compatible(&self, other: &FieldConfiguration, path: &str) -> Result<(), ValidationError> {
        if self.field_type != other.field_type || self.multilingual != other.multilingual {
            return Err(ValidationError::FieldConflict {
                field: path.to_string(),
                existing: self.describe(),
                requested: other.describe(),
            });
        }
        for nested in &other.nested_fields {
            if let Some(existing) = self.nested_field(&nested.name) {
                existing.check_compatible(nested, &format!("{}.{}", path, nested.name))?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        if self.multilingual {
            format!("multilingual {}", self.field_type)
        } else {
            self.field_type.to_string()
        }
    }
}

/// Field configurations plus the languages of multilingual fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    /// Top-level field configurations.
    #[serde(default)]
    pub fields: Vec<FieldConfiguration>,

    /// Languages of multilingual fields; the first one is the default.
    #[serde(default)]
    pub languages: Vec<String>,
}

impl MappingConfiguration {
    /// Creates a mapping with the given fields and languages.
    pub fn new(fields: Vec<FieldConfiguration>, languages: Vec<String>) -> Self {
        Self { fields, languages }
    }

    /// Returns the default language, if any languages are configured.
    pub fn default_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }

    /// Returns the top-level field with the given name.
    pub fn field(&self, name: &str) -> Option<&FieldConfiguration> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolves a dotted path (`relation.field`) to its configuration.
    pub fn field_at(&self, path: &str) -> Option<&FieldConfiguration> {
        let mut segments = path.split('.');
        let mut current = self.field(segments.next()?)?;
        for segment in segments {
            match current.nested_field(segment) {
                Some(next) => current = next,
                // language or keyword suffix of a leaf
                None if !current.is_nested() => return Some(current),
                None => return None,
            }
        }
        Some(current)
    }

    /// Returns the nested relation a dotted path lives in, if any.
    pub fn nested_relation<'a>(&self, path: &'a str) -> Option<&'a str> {
        let (root, rest) = path.split_once('.')?;
        if rest.is_empty() {
            return None;
        }
        self.field(root).filter(|f| f.is_nested()).map(|_| root)
    }

    /// Returns the names of all nested relations.
    pub fn nested_relations(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_nested())
            .map(|f| f.name.as_str())
    }

    /// Resolves the name used for matching: multilingual fields get the
    /// language suffix.
    pub fn resolve_field_name(&self, path: &str, language: Option<&str>) -> String {
        match self.field_at(path) {
            Some(field) if field.multilingual => {
                match language.or_else(|| self.default_language()) {
                    Some(lang) => format!("{}.{}", path, lang),
                    None => path.to_string(),
                }
            }
            _ => path.to_string(),
        }
    }

    /// Returns the fields of `additions` that are new or changed.
    ///
    /// Fails on the first field whose type would change; nothing is applied.
    pub fn plan_additions(
        &self,
        additions: &[FieldConfiguration],
    ) -> Result<Vec<FieldConfiguration>, ValidationError> {
        let mut changed = Vec::new();
        for addition in additions {
            match self.field(&addition.name) {
                Some(existing) if existing == addition => {}
                Some(existing) => {
                    existing.check_compatible(addition, &addition.name)?;
                    changed.push(merge_nested(existing, addition));
                }
                None => changed.push(addition.clone()),
            }
        }
        Ok(changed)
    }

    /// Applies fields returned by [`plan_additions`](Self::plan_additions).
    pub fn apply(&mut self, fields: Vec<FieldConfiguration>) {
        for field in fields {
            match self.fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => self.fields.push(field),
            }
        }
    }
}

// Keeps nested subfields of `existing` that `addition` does not mention.
fn merge_nested(existing: &FieldConfiguration, addition: &FieldConfiguration) -> FieldConfiguration {
    let mut merged = addition.clone();
    for nested in &existing.nested_fields {
        if merged.nested_field(&nested.name).is_none() {
            merged.nested_fields.push(nested.clone());
        }
    }
    merged
}
