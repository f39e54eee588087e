//! Search and suggest results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::SearchHitDto;

/// One page of search hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Hits on this page, in engine order.
    pub items: Vec<SearchHitDto>,

    /// Page returned (1-based).
    pub page_index: u32,

    /// Requested page size.
    pub page_size: u32,

    /// Number of matching documents, possibly a lower bound.
    pub total_hit_count: u64,

    /// Whether `total_hit_count` is exact.
    pub exact_hit_count: bool,
}

impl SearchResult {
    /// Creates a result page.
    pub fn new(
        items: Vec<SearchHitDto>,
        page_index: u32,
        page_size: u32,
        total_hit_count: u64,
        exact_hit_count: bool,
    ) -> Self {
        Self {
            items,
            page_index,
            page_size,
            total_hit_count,
            exact_hit_count,
        }
    }

    /// Creates an empty first page.
    pub fn empty(page_size: u32) -> Self {
        Self::new(Vec::new(), 1, page_size, 0, true)
    }

    /// Returns the number of pages needed for all hits.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_hit_count.div_ceil(u64::from(self.page_size))
    }

    /// Returns the number of hits on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page holds no hits.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the hit ids on this page.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(SearchHitDto::id).collect()
    }
}

/// Completion candidates keyed by suggest name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestResult {
    suggestions: HashMap<String, Vec<String>>,
}

impl SuggestResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the candidates for one suggest request.
    pub fn insert(&mut self, name: impl Into<String>, candidates: Vec<String>) {
        self.suggestions.insert(name.into(), candidates);
    }

    /// Returns the candidates for `name`, best first.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.suggestions.get(name).map(Vec::as_slice)
    }

    /// Returns all suggestions.
    pub fn suggestions(&self) -> &HashMap<String, Vec<String>> {
        &self.suggestions
    }
}
