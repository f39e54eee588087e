//! In-memory backend.
//!
//! Evaluates expressions in process with the same matching rules the
//! Elasticsearch backend expresses in its query DSL. Useful for tests and
//! for embedding the search layer without an external engine.

mod engine;
mod matcher;

pub use engine::MemorySearchEngine;
