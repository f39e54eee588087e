//! Sift single-index search layer
//!
//! This crate puts a document indexing and search abstraction in front of an
//! external full-text search engine. Callers describe documents, mutations and
//! search criteria in a backend-agnostic model; the crate translates them into
//! engine operations while managing which physical index an alias points at.
//!
//! # Features
//!
//! - **Expression algebra**: typed conditions with `optimize()`, boosting,
//!   phrase matching, fulltext, ranges and suggestions
//! - **Alias indirection**: every search and write goes through an alias bound
//!   to a timestamped physical index, so an index can be rebuilt and swapped in
//! - **Nested inner hits**: matching nested documents come back with each hit
//! - **Processing modes**: blocking writes are visible to the next search,
//!   background writes become visible on the engine's schedule
//!
//! # Backend Features
//!
//! - `elasticsearch` (default) - Elasticsearch over HTTP
//!
//! The in-memory engine in [`backends::memory`] is always available.
//!
//! # Architecture
//!
//! - [`expression`] - Search expressions and their optimization
//! - [`types`] - Hits, results, parameters and field configuration
//! - [`core`] - Engine trait, index lifecycle, document and search facades
//! - [`service`] - All facades behind one handle
//! - [`backends`] - Engine implementations
//! - [`timing`] - Timed execution with diagnostic records
//! - [`account`] - Account context and query augmentation
//! - [`config`] - Index presets
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use sift_search::backends::memory::MemorySearchEngine;
//! use sift_search::config::IndexPresetConfiguration;
//! use sift_search::expression::ValueExpression;
//! use sift_search::service::SingleIndexService;
//! use sift_search::types::{DataChangeProcessingMode, SearchParameter};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! runtime.block_on(async {
//!     let service = SingleIndexService::builder(
//!         Arc::new(MemorySearchEngine::new()),
//!         IndexPresetConfiguration::new("hotels"),
//!     )
//!     .build();
//!     service.create_index_with_alias().await.unwrap();
//!
//!     let hotel = json!({ "id": "h1", "name": "Grand Hotel", "city": "Rome" });
//!     service
//!         .add_document(DataChangeProcessingMode::Blocking, hotel.as_object().unwrap().clone())
//!         .await
//!         .unwrap();
//!
//!     let result = service
//!         .search(ValueExpression::new("city", "Rome").into(), &SearchParameter::new())
//!         .await
//!         .unwrap();
//!     assert_eq!(result.ids(), vec!["h1"]);
//! });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod account;
pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod expression;
pub mod service;
pub mod timing;
pub mod types;

pub use error::{SearchIndexError, SearchIndexResult};
pub use service::{SingleIndexService, SingleIndexServiceBuilder};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
