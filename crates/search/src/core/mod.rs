//! Index lifecycle, document and search facades over a [`SearchEngine`].
//!
//! - [`SearchEngine`] - the external engine boundary
//! - [`AliasState`] - shared alias binding
//! - [`IndexLifecycle`] - alias to versioned index indirection
//! - [`DocumentService`] - document writes and reads
//! - [`SearchService`] - searches and suggestions
//!
//! All three facades resolve the live index through the same
//! [`IndexLifecycle`], so they agree on which physical index an alias means.

mod alias;
mod documents;
mod engine;
mod lifecycle;
mod search;

pub use alias::{AliasBinding, AliasState};
pub use documents::DocumentService;
pub use engine::{EngineQuery, SearchEngine, SearchRequest, SearchResponse};
pub use lifecycle::IndexLifecycle;
pub use search::SearchService;
