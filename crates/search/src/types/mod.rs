//! Core types for the search layer.
//!
//! - [`SearchHitDto`], [`SearchResult`], [`SuggestResult`] - search results
//! - [`SearchParameter`] - paging, sorting, language and inner hits
//! - [`DataChangeProcessingMode`] - when data-changing calls return
//! - [`FieldConfiguration`], [`MappingConfiguration`] - field mapping
//! - [`IndexObject`] - typed objects stored as documents
//!
//! # Example
//!
//! ```
//! use sift_search::types::{InnerHitsOption, SearchParameter, SortOption};
//!
//! let params = SearchParameter::new()
//!     .with_page_size(10)
//!     .with_page_index(2)
//!     .with_sort(SortOption::desc("created"))
//!     .with_inner_hits(InnerHitsOption::new("persons").with_size(5));
//!
//! assert_eq!(params.offset(), 10);
//! ```

mod field_config;
mod index_object;
mod info;
mod processing_mode;
mod search_hit;
mod search_params;
mod search_result;

pub use field_config::{
    FULLTEXT_FIELD, FieldConfiguration, FieldType, KEYWORD_SUBFIELD, MappingConfiguration,
    SUGGEST_SUBFIELD,
};
pub use index_object::{IndexObject, document_id, from_document, to_document};
pub use info::ElasticsearchInfo;
pub use processing_mode::DataChangeProcessingMode;
pub use search_hit::{Document, ID_FIELD, SearchHitDto};
pub use search_params::{
    InnerHitsOption, RELEVANCE_SORT_FIELD, SearchParameter, SortDirection, SortOption,
};
pub use search_result::{SearchResult, SuggestResult};
