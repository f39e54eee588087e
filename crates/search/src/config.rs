//! Index presets.
//!
//! [`IndexPresetConfiguration`] names the alias, the naming scheme of the
//! physical indices behind it and the settings used when creating them.

use serde::{Deserialize, Serialize};

fn default_index_alias() -> String {
    "sift".to_string()
}

fn default_index_name_date_format() -> String {
    "%Y%m%d-%H%M%S-%3f".to_string()
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

fn default_max_result_window() -> u32 {
    10000
}

fn default_fields_limit() -> u32 {
    1000
}

fn default_refresh_interval() -> String {
    "1s".to_string()
}

fn default_true() -> bool {
    true
}

/// Configuration of the index behind one alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPresetConfiguration {
    /// Alias callers address (default: `"sift"`).
    #[serde(default = "default_index_alias")]
    pub index_alias: String,

    /// Prefix of physical index names (default: the alias).
    #[serde(default)]
    pub index_name_prefix: Option<String>,

    /// `chrono` format of the timestamp part of physical index names
    /// (default: `"%Y%m%d-%H%M%S-%3f"`).
    #[serde(default = "default_index_name_date_format")]
    pub index_name_date_format: String,

    /// Number of primary shards (default: 1).
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    /// Number of replica shards (default: 1).
    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,

    /// Maximum result window (default: 10000).
    #[serde(default = "default_max_result_window")]
    pub max_result_window: u32,

    /// Maximum number of mapped fields (default: 1000).
    #[serde(default = "default_fields_limit")]
    pub fields_limit: u32,

    /// Refresh interval (default: "1s").
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    /// Whether the previously bound index is deleted when a new index takes
    /// over the alias (default: true).
    #[serde(default = "default_true")]
    pub delete_superseded_indices: bool,
}

impl Default for IndexPresetConfiguration {
    fn default() -> Self {
        Self {
            index_alias: default_index_alias(),
            index_name_prefix: None,
            index_name_date_format: default_index_name_date_format(),
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
            max_result_window: default_max_result_window(),
            fields_limit: default_fields_limit(),
            refresh_interval: default_refresh_interval(),
            delete_superseded_indices: default_true(),
        }
    }
}

impl IndexPresetConfiguration {
    /// Creates a preset for `alias` with default settings.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            index_alias: alias.into(),
            ..Self::default()
        }
    }

    /// Sets the prefix of physical index names.
    pub fn with_index_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_name_prefix = Some(prefix.into());
        self
    }

    /// Sets the number of replicas.
    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = replicas;
        self
    }

    /// Keeps superseded indices instead of deleting them.
    pub fn keep_superseded_indices(mut self) -> Self {
        self.delete_superseded_indices = false;
        self
    }

    /// Returns the prefix of physical index names.
    pub fn index_name_prefix(&self) -> &str {
        self.index_name_prefix
            .as_deref()
            .unwrap_or(&self.index_alias)
    }

    /// Returns the settings applied when creating an index.
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            number_of_shards: self.number_of_shards,
            number_of_replicas: self.number_of_replicas,
            max_result_window: self.max_result_window,
            fields_limit: self.fields_limit,
            refresh_interval: self.refresh_interval.clone(),
        }
    }
}

/// Engine settings of a newly created index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Number of primary shards.
    pub number_of_shards: u32,
    /// Number of replica shards.
    pub number_of_replicas: u32,
    /// Maximum result window.
    pub max_result_window: u32,
    /// Maximum number of mapped fields.
    pub fields_limit: u32,
    /// Refresh interval.
    pub refresh_interval: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexPresetConfiguration::default().index_settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexPresetConfiguration::new("pictures");
        assert_eq!(config.index_name_prefix(), "pictures");
        assert!(config.delete_superseded_indices);
        assert_eq!(config.index_settings().max_result_window, 10000);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: IndexPresetConfiguration = serde_json::from_str(
            r#"{"index_alias": "pictures", "index_name_prefix": "pic", "number_of_replicas": 0}"#,
        )
        .unwrap();
        assert_eq!(config.index_name_prefix(), "pic");
        assert_eq!(config.number_of_replicas, 0);
        assert_eq!(config.number_of_shards, 1);
        assert_eq!(config.refresh_interval, "1s");
    }
}
