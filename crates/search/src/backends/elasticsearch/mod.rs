//! Elasticsearch backend implementation.
//!
//! Translates the engine boundary onto the Elasticsearch REST API:
//! - Index creation with settings and a mapping derived from field configurations
//! - Aliases switched atomically with one `_aliases` request
//! - Index version stored in the mapping `_meta` section
//! - Document writes through `_bulk`, with `refresh=wait_for` in blocking mode
//! - Expressions translated to Query DSL, nested relations to `nested` queries
//!   with `inner_hits`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sift_search::backends::elasticsearch::{ElasticsearchConfig, ElasticsearchEngine};
//!
//! let config = ElasticsearchConfig::new("http://localhost:9200");
//! let engine = Arc::new(ElasticsearchEngine::new(config)?);
//! ```

mod backend;
mod engine_impl;
mod query_builder;
mod response;
mod schema;

pub use backend::{ElasticsearchAuth, ElasticsearchConfig, ElasticsearchEngine};
