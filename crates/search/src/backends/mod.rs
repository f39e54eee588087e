//! Search engine backends.
//!
//! - [`memory`] - in-process engine
//! - `elasticsearch` - Elasticsearch over HTTP (feature `elasticsearch`)

pub mod memory;

#[cfg(feature = "elasticsearch")]
pub mod elasticsearch;
