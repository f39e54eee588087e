//! Search execution parameters.

use serde::{Deserialize, Serialize};

/// Sort field name that orders by relevance score.
pub const RELEVANCE_SORT_FIELD: &str = "_score";

fn default_page_size() -> u32 {
    20
}

fn default_page_index() -> u32 {
    1
}

fn default_max_results() -> u32 {
    10_000
}

fn default_inner_hits_size() -> u32 {
    3
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Returns the engine's name for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Sorts results by one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOption {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortOption {
    /// Sorts ascending by `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sorts descending by `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Sorts by relevance, best match first.
    pub fn relevance() -> Self {
        Self::desc(RELEVANCE_SORT_FIELD)
    }

    /// Returns `true` if this option sorts by relevance.
    pub fn is_relevance(&self) -> bool {
        self.field == RELEVANCE_SORT_FIELD
    }
}

/// Requests inner hits for one nested relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InnerHitsOption {
    /// Name of the nested relation (the nested field name).
    pub relation: String,
    /// Maximum number of inner hits per parent hit.
    #[serde(default = "default_inner_hits_size")]
    pub size: u32,
}

impl InnerHitsOption {
    /// Requests inner hits for `relation` with the default size.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            size: default_inner_hits_size(),
        }
    }

    /// Sets the maximum number of inner hits per parent hit.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

/// Parameters for a search: paging, sorting, language and inner hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameter {
    /// Number of hits per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page to return, starting at 1.
    #[serde(default = "default_page_index")]
    pub page_index: u32,

    /// Sort options, applied in order.
    #[serde(default)]
    pub sort_options: Vec<SortOption>,

    /// Language used to resolve multilingual fields (e.g. `"de"`).
    #[serde(default)]
    pub language: Option<String>,

    /// Nested relations to return inner hits for.
    #[serde(default)]
    pub inner_hits: Vec<InnerHitsOption>,

    /// Restricts returned attributes to these fields (empty = all).
    #[serde(default)]
    pub fields_to_resolve: Vec<String>,

    /// Upper limit for `offset + page_size`.
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for SearchParameter {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_index: default_page_index(),
            sort_options: Vec::new(),
            language: None,
            inner_hits: Vec::new(),
            fields_to_resolve: Vec::new(),
            max_results: default_max_results(),
        }
    }
}

impl SearchParameter {
    /// Creates parameters with default paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the page index (1-based).
    pub fn with_page_index(mut self, page_index: u32) -> Self {
        self.page_index = page_index;
        self
    }

    /// Adds a sort option.
    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort_options.push(sort);
        self
    }

    /// Sets the language for multilingual fields.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Requests inner hits for a nested relation.
    pub fn with_inner_hits(mut self, option: InnerHitsOption) -> Self {
        self.inner_hits.push(option);
        self
    }

    /// Restricts the returned attributes.
    pub fn with_fields_to_resolve<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields_to_resolve = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the hard result limit.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Returns the offset of the first hit of the requested page, clamped
    /// to `max_results`.
    pub fn offset(&self) -> u32 {
        self.page_window(u32::MAX).0
    }

    /// Returns the number of hits to fetch, clamped to `max_results`.
    pub fn effective_size(&self) -> u32 {
        self.page_window(u32::MAX).1
    }

    /// Returns `from` and `size` for the requested page such that
    /// `from + size` stays within both `max_results` and `result_window`.
    pub fn page_window(&self, result_window: u32) -> (u32, u32) {
        let limit = self.max_results.min(result_window);
        let from = self
            .page_index
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(limit);
        (from, self.page_size.min(limit - from))
    }

    /// Returns the inner hits option for `relation`, if requested.
    pub fn inner_hits_for(&self, relation: &str) -> Option<&InnerHitsOption> {
        self.inner_hits.iter().find(|o| o.relation == relation)
    }
}
